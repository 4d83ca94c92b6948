//! String methods
use crate::interp::bind;
use crate::{arg, Error, Extern, Interp, Result, Val};

pub const METHODS: &[&str] = &[
    "charAt", "endsWith", "includes", "indexOf", "padEnd", "padStart", "repeat", "replace",
    "replaceAll", "slice", "split", "startsWith", "substring", "toLowerCase", "toString",
    "toUpperCase", "trim", "trimEnd", "trimStart",
];

/// Property lookup on strings
pub(crate) fn get<T: Extern>(recv: &Val<T>, s: &str, key: &str) -> Val<T> {
    if key == "length" {
        return Val::Num(s.chars().count() as f64);
    }
    if let Ok(idx) = key.parse::<usize>() {
        return s
            .chars()
            .nth(idx)
            .map_or(Val::Undefined, |c| Val::Str(c.to_string()));
    }
    if METHODS.contains(&key) {
        return bind(recv, key);
    }
    Val::Undefined
}

/// Character index from argument, clamped to `0..=len`
fn index<T: Extern>(v: &Val<T>, len: usize, default: usize, negative_from_end: bool) -> usize {
    let n = match v {
        Val::Undefined => return default,
        v => v.to_number(),
    };
    if n.is_nan() {
        0
    } else if n < 0.0 {
        if negative_from_end {
            (len as f64 + n.trunc()).max(0.0) as usize
        } else {
            0
        }
    } else {
        (n.trunc() as usize).min(len)
    }
}

fn substr(chars: &[char], start: usize, end: usize) -> String {
    if start < end {
        chars[start..end].iter().collect()
    } else {
        String::new()
    }
}

fn pad(s: &str, args: &[Val<impl Extern>], at_start: bool) -> String {
    let target = arg(args, 0).to_number();
    let fill = match arg(args, 1) {
        Val::Undefined => " ".to_string(),
        v => v.to_js_string(),
    };
    let len = s.chars().count();
    if target.is_nan() || target as usize <= len || fill.is_empty() {
        return s.to_string();
    }
    let padding: String = fill.chars().cycle().take(target as usize - len).collect();
    if at_start {
        padding + s
    } else {
        s.to_string() + &padding
    }
}

/// Call method `name` on string
pub(crate) fn call<T: Extern>(
    interp: &mut Interp<T>,
    s: &str,
    name: &str,
    args: Vec<Val<T>>,
) -> Result<Val<T>> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let text = |i: usize| match arg(&args, i) {
        Val::Undefined => "undefined".to_string(),
        v => v.to_js_string(),
    };

    let result = match name {
        "toString" => Val::string(s),
        "toUpperCase" => Val::Str(s.to_uppercase()),
        "toLowerCase" => Val::Str(s.to_lowercase()),
        "trim" => Val::string(s.trim()),
        "trimStart" => Val::string(s.trim_start()),
        "trimEnd" => Val::string(s.trim_end()),
        "charAt" => {
            let idx = arg(&args, 0).to_number();
            let idx = if idx.is_nan() { 0.0 } else { idx };
            match chars.get(idx as usize) {
                Some(c) if idx >= 0.0 => Val::Str(c.to_string()),
                _ => Val::string(""),
            }
        }
        "includes" => Val::Bool(s.contains(&text(0))),
        "startsWith" => Val::Bool(s.starts_with(&text(0))),
        "endsWith" => Val::Bool(s.ends_with(&text(0))),
        "indexOf" => {
            let needle = text(0);
            Val::Num(
                s.find(&needle)
                    .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
            )
        }
        "slice" => {
            let start = index(&arg(&args, 0), len, 0, true);
            let end = index(&arg(&args, 1), len, len, true);
            Val::Str(substr(&chars, start, end))
        }
        "substring" => {
            let a = index(&arg(&args, 0), len, 0, false);
            let b = index(&arg(&args, 1), len, len, false);
            Val::Str(substr(&chars, a.min(b), a.max(b)))
        }
        "split" => match arg(&args, 0) {
            Val::Undefined => Val::array(vec![Val::string(s)]),
            sep => {
                let sep = sep.to_js_string();
                let parts: Vec<Val<T>> = if sep.is_empty() {
                    chars.iter().map(|c| Val::Str(c.to_string())).collect()
                } else {
                    s.split(sep.as_str()).map(Val::string).collect()
                };
                let limit = match arg(&args, 1) {
                    Val::Undefined => parts.len(),
                    v => v.to_number().max(0.0) as usize,
                };
                Val::array(parts.into_iter().take(limit).collect())
            }
        },
        "repeat" => {
            let count = arg(&args, 0).to_number();
            if count.is_nan() || count < 0.0 || count.is_infinite() {
                return Err(Error::Range(format!("Invalid count value: {}", crate::fmt_num(count))));
            }
            Val::Str(s.repeat(count as usize))
        }
        "padStart" => Val::Str(pad(s, &args, true)),
        "padEnd" => Val::Str(pad(s, &args, false)),
        "replace" | "replaceAll" => {
            let pattern = text(0);
            let replacement = arg(&args, 1);
            let mut out = String::new();
            let mut rest = s;
            while let Some(pos) = rest.find(&pattern) {
                out.push_str(&rest[..pos]);
                let with = if replacement.is_callable() {
                    interp
                        .call(&replacement, vec![Val::Str(pattern.clone())])?
                        .to_js_string()
                } else {
                    replacement.to_js_string()
                };
                out.push_str(&with);
                rest = &rest[pos + pattern.len()..];
                if name == "replace" || pattern.is_empty() {
                    break;
                }
            }
            out.push_str(rest);
            Val::Str(out)
        }
        _ => return Err(Error::Type(format!("{name} is not a function"))),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use void::Void;

    type Interp = crate::Interp<Void>;

    fn eval_str(text: &str) -> String {
        Interp::new().eval(text).unwrap().to_string()
    }

    #[test]
    fn case_and_trim() {
        assert_eq!(eval_str("return ' Bar Chart '.trim().toUpperCase()"), "BAR CHART");
        assert_eq!(eval_str("return 'ABC'.toLowerCase()"), "abc");
    }

    #[test]
    fn length_and_index() {
        assert_eq!(eval_str("return 'hello'.length"), "5");
        assert_eq!(eval_str("return 'hello'[1]"), "e");
        assert_eq!(eval_str("return 'hello'.indexOf('l')"), "2");
    }

    #[test]
    fn slicing() {
        assert_eq!(eval_str("return 'bar-chart'.slice(4)"), "chart");
        assert_eq!(eval_str("return 'bar-chart'.slice(-5, -1)"), "char");
        assert_eq!(eval_str("return 'bar-chart'.substring(3, 0)"), "bar");
    }

    #[test]
    fn split_and_replace() {
        assert_eq!(eval_str("return 'a-b-c'.split('-').length"), "3");
        assert_eq!(eval_str("return 'abc'.split('')"), "a,b,c");
        assert_eq!(eval_str("return 'a-b-c'.replace('-', ' ')"), "a b-c");
        assert_eq!(eval_str("return 'a-b-c'.replaceAll('-', ' ')"), "a b c");
        assert_eq!(
            eval_str("return 'line-chart'.split('-').map(w => w[0].toUpperCase() + w.slice(1)).join(' ')"),
            "Line Chart"
        );
    }

    #[test]
    fn padding() {
        assert_eq!(eval_str("return '7'.padStart(3, '0')"), "007");
        assert_eq!(eval_str("return 'ab'.padEnd(5, 'xy')"), "abxyx");
        assert_eq!(eval_str("return 'long'.padStart(2)"), "long");
    }

    #[test]
    fn predicates() {
        assert_eq!(eval_str("return 'scatterplot'.startsWith('scatter')"), "true");
        assert_eq!(eval_str("return 'scatterplot'.includes('plot')"), "true");
        assert_eq!(eval_str("return 'scatterplot'.endsWith('x')"), "false");
    }
}
