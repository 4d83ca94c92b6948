//! Number conversion and methods
use crate::types::parse_number;
use crate::{arg, fmt_num, Error, Extern, Interp, Result, Val};

pub const METHODS: &[&str] = &["toFixed", "toString", "toPrecision"];

/// `Number(value)`
pub(crate) fn constructor<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::Num(match args.first() {
        Some(v) => v.to_number(),
        None => 0.0,
    }))
}

pub(crate) fn static_member<T: Extern>(key: &str) -> Option<Val<T>> {
    let val = match key {
        "isFinite" => Val::native("isFinite", |_, args| {
            Ok(Val::Bool(matches!(arg(args, 0), Val::Num(n) if n.is_finite())))
        }),
        "isInteger" => Val::native("isInteger", |_, args| {
            Ok(Val::Bool(
                matches!(arg(args, 0), Val::Num(n) if n.is_finite() && n.fract() == 0.0),
            ))
        }),
        "isNaN" => Val::native("isNaN", |_, args| {
            Ok(Val::Bool(matches!(arg(args, 0), Val::Num(n) if n.is_nan())))
        }),
        "MAX_SAFE_INTEGER" => Val::Num(9007199254740991.0),
        "EPSILON" => Val::Num(f64::EPSILON),
        _ => return None,
    };
    Some(val)
}

/// Call method `name` on number
pub(crate) fn call<T: Extern>(
    _: &mut Interp<T>,
    n: f64,
    name: &str,
    args: Vec<Val<T>>,
) -> Result<Val<T>> {
    match name {
        "toFixed" => {
            let digits = match arg(&args, 0) {
                Val::Undefined => 0.0,
                v => v.to_number(),
            };
            if !(0.0..=100.0).contains(&digits) {
                return Err(Error::Range(
                    "toFixed() digits argument must be between 0 and 100".to_string(),
                ));
            }
            if !n.is_finite() {
                return Ok(Val::Str(fmt_num(n)));
            }
            Ok(Val::Str(format!("{:.*}", digits as usize, n)))
        }
        "toPrecision" => match arg(&args, 0) {
            Val::Undefined => Ok(Val::Str(fmt_num(n))),
            p => {
                let p = p.to_number();
                if !(1.0..=100.0).contains(&p) {
                    return Err(Error::Range(
                        "toPrecision() argument must be between 1 and 100".to_string(),
                    ));
                }
                if n == 0.0 || !n.is_finite() {
                    return Ok(Val::Str(format!("{:.*}", p as usize - 1, n)));
                }
                let magnitude = n.abs().log10().floor() as i32;
                let decimals = (p as i32 - 1 - magnitude).max(0) as usize;
                Ok(Val::Str(format!("{:.*}", decimals, n)))
            }
        },
        "toString" => match arg(&args, 0) {
            Val::Undefined => Ok(Val::Str(fmt_num(n))),
            radix => {
                let radix = radix.to_number() as u32;
                if !(2..=36).contains(&radix) {
                    return Err(Error::Range(
                        "toString() radix must be between 2 and 36".to_string(),
                    ));
                }
                Ok(Val::Str(to_radix(n, radix)))
            }
        },
        _ => Err(Error::Type(format!("{name} is not a function"))),
    }
}

/// Integer part of `n` rendered in `radix`
fn to_radix(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() {
        return fmt_num(n);
    }
    let mut v = n.abs().trunc() as u64;
    if v == 0 {
        return "0".to_string();
    }
    let mut digits = vec![];
    while v > 0 {
        digits.push(std::char::from_digit((v % radix as u64) as u32, radix).unwrap_or('0'));
        v /= radix as u64;
    }
    if n < 0.0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Longest numeric prefix of a string
fn numeric_prefix(s: &str) -> &str {
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        let ok = match c {
            '0'..='9' => true,
            '+' | '-' => i == 0 || matches!(bytes[i - 1] as char, 'e' | 'E'),
            '.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                true
            }
            'e' | 'E' if !seen_exp && end > 0 => {
                seen_exp = true;
                true
            }
            _ => false,
        };
        if !ok {
            break;
        }
        i += 1;
        if c.is_ascii_digit() {
            end = i;
        }
    }
    &s[..end]
}

/// `parseFloat(string)`
pub(crate) fn parse_float<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let s = arg(args, 0).to_js_string();
    let s = s.trim_start();
    if s.starts_with("Infinity") || s.starts_with("+Infinity") {
        return Ok(Val::Num(f64::INFINITY));
    }
    if s.starts_with("-Infinity") {
        return Ok(Val::Num(f64::NEG_INFINITY));
    }
    let prefix = numeric_prefix(s);
    Ok(Val::Num(if prefix.is_empty() {
        f64::NAN
    } else {
        parse_number(prefix)
    }))
}

/// `parseInt(string, radix = 10)`
pub(crate) fn parse_int<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let s = arg(args, 0).to_js_string();
    let s = s.trim_start();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let mut radix = match arg(args, 1) {
        Val::Undefined => 0,
        v => v.to_number() as u32,
    };
    let mut digits = s;
    if (radix == 16 || radix == 0) && (s.starts_with("0x") || s.starts_with("0X")) {
        digits = &s[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Ok(Val::Num(f64::NAN));
    }
    let mut value: Option<f64> = None;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => value = Some(value.unwrap_or(0.0) * radix as f64 + d as f64),
            None => break,
        }
    }
    Ok(Val::Num(match value {
        Some(v) if negative => -v,
        Some(v) => v,
        None => f64::NAN,
    }))
}

#[cfg(test)]
mod tests {
    use void::Void;

    type Interp = crate::Interp<Void>;

    fn eval_str(text: &str) -> String {
        Interp::new().eval(text).unwrap().to_string()
    }

    #[test]
    fn to_fixed() {
        assert_eq!(eval_str("return (0.08167).toFixed(2)"), "0.08");
        assert_eq!(eval_str("return (12).toFixed(1)"), "12.0");
        assert_eq!(eval_str("const n = 3.14159; return n.toFixed()"), "3");
    }

    #[test]
    fn to_string_radix() {
        assert_eq!(eval_str("return (255).toString(16)"), "ff");
        assert_eq!(eval_str("return (1.5).toString()"), "1.5");
    }

    #[test]
    fn parsing() {
        assert_eq!(eval_str("return parseFloat('3.5px')"), "3.5");
        assert_eq!(eval_str("return parseFloat('abc')"), "NaN");
        assert_eq!(eval_str("return parseInt('42.9')"), "42");
        assert_eq!(eval_str("return parseInt('-0x1f')"), "-31");
        assert_eq!(eval_str("return Number('12') + 1"), "13");
    }

    #[test]
    fn statics() {
        assert_eq!(eval_str("return Number.isFinite(1) && !Number.isFinite('1')"), "true");
        assert_eq!(eval_str("return Number.isInteger(2.5)"), "false");
    }
}
