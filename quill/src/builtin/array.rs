//! Array methods and the `Array` namespace
use crate::interp::bind;
use crate::types::strict_eq;
use crate::{arg, ArrayRef, Error, Extern, Interp, Result, Val};
use std::cmp::Ordering;

/// Largest array snippets may allocate
pub const MAX_LENGTH: usize = 1 << 24;

pub const METHODS: &[&str] = &[
    "at", "concat", "every", "fill", "filter", "find", "findIndex", "flat", "forEach", "includes",
    "indexOf", "join", "map", "pop", "push", "reduce", "reverse", "shift", "slice", "some",
    "sort", "unshift",
];

pub fn namespace<T: Extern>() -> Val<T> {
    Val::object([
        ("from", Val::native("from", from)),
        ("isArray", Val::native("isArray", is_array)),
        ("of", Val::native("of", of)),
    ])
}

/// Property lookup on arrays
pub(crate) fn get<T: Extern>(recv: &Val<T>, a: &ArrayRef<T>, key: &str) -> Val<T> {
    if key == "length" {
        return Val::Num(a.lock().unwrap().len() as f64);
    }
    if let Ok(idx) = key.parse::<usize>() {
        return a.lock().unwrap().get(idx).cloned().unwrap_or(Val::Undefined);
    }
    if METHODS.contains(&key) {
        return bind(recv, key);
    }
    Val::Undefined
}

fn snapshot<T: Extern>(a: &ArrayRef<T>) -> Vec<Val<T>> {
    a.lock().unwrap().clone()
}

fn callback<T: Extern>(args: &[Val<T>], method: &str) -> Result<Val<T>> {
    match args.first() {
        Some(f) if f.is_callable() => Ok(f.clone()),
        Some(f) => Err(Error::Type(format!("{} is not a function", f.inspect()))),
        None => Err(Error::Type(format!(
            "undefined is not a function (Array.prototype.{method})"
        ))),
    }
}

/// Resolve a possibly negative index against length
fn relative<T: Extern>(idx: &Val<T>, len: usize, default: usize) -> usize {
    let n = match idx {
        Val::Undefined => return default,
        v => v.to_number(),
    };
    if n.is_nan() {
        0
    } else if n < 0.0 {
        (len as f64 + n.trunc()).max(0.0) as usize
    } else {
        (n.trunc() as usize).min(len)
    }
}

/// Call method `name` on array
pub(crate) fn call<T: Extern>(
    interp: &mut Interp<T>,
    a: &ArrayRef<T>,
    name: &str,
    args: Vec<Val<T>>,
) -> Result<Val<T>> {
    let this = Val::Array(a.clone());
    match name {
        "push" => {
            let mut items = a.lock().unwrap();
            items.extend(args);
            Ok(Val::Num(items.len() as f64))
        }
        "pop" => Ok(a.lock().unwrap().pop().unwrap_or(Val::Undefined)),
        "shift" => {
            let mut items = a.lock().unwrap();
            if items.is_empty() {
                Ok(Val::Undefined)
            } else {
                Ok(items.remove(0))
            }
        }
        "unshift" => {
            let mut items = a.lock().unwrap();
            items.splice(0..0, args);
            Ok(Val::Num(items.len() as f64))
        }
        "at" => {
            let items = snapshot(a);
            let n = arg(&args, 0).to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let idx = if n < 0.0 { items.len() as f64 + n } else { n };
            if idx < 0.0 {
                return Ok(Val::Undefined);
            }
            Ok(items.get(idx as usize).cloned().unwrap_or(Val::Undefined))
        }
        "map" => {
            let f = callback(&args, name)?;
            let mut out = vec![];
            for (i, v) in snapshot(a).into_iter().enumerate() {
                out.push(interp.call(&f, vec![v, Val::Num(i as f64), this.clone()])?);
            }
            Ok(Val::array(out))
        }
        "filter" => {
            let f = callback(&args, name)?;
            let mut out = vec![];
            for (i, v) in snapshot(a).into_iter().enumerate() {
                if interp
                    .call(&f, vec![v.clone(), Val::Num(i as f64), this.clone()])?
                    .truthy()
                {
                    out.push(v);
                }
            }
            Ok(Val::array(out))
        }
        "forEach" => {
            let f = callback(&args, name)?;
            for (i, v) in snapshot(a).into_iter().enumerate() {
                interp.call(&f, vec![v, Val::Num(i as f64), this.clone()])?;
            }
            Ok(Val::Undefined)
        }
        "reduce" => {
            let f = callback(&args, name)?;
            let mut items = snapshot(a).into_iter().enumerate();
            let mut acc = match args.get(1) {
                Some(init) => init.clone(),
                None => match items.next() {
                    Some((_, v)) => v,
                    None => {
                        return Err(Error::Type(
                            "Reduce of empty array with no initial value".to_string(),
                        ))
                    }
                },
            };
            for (i, v) in items {
                acc = interp.call(&f, vec![acc, v, Val::Num(i as f64), this.clone()])?;
            }
            Ok(acc)
        }
        "find" | "findIndex" | "some" | "every" => {
            let f = callback(&args, name)?;
            for (i, v) in snapshot(a).into_iter().enumerate() {
                let hit = interp
                    .call(&f, vec![v.clone(), Val::Num(i as f64), this.clone()])?
                    .truthy();
                match (name, hit) {
                    ("find", true) => return Ok(v),
                    ("findIndex", true) => return Ok(Val::Num(i as f64)),
                    ("some", true) => return Ok(Val::Bool(true)),
                    ("every", false) => return Ok(Val::Bool(false)),
                    _ => (),
                }
            }
            Ok(match name {
                "find" => Val::Undefined,
                "findIndex" => Val::Num(-1.0),
                "some" => Val::Bool(false),
                _ => Val::Bool(true),
            })
        }
        "slice" => {
            let items = snapshot(a);
            let len = items.len();
            let start = relative(&arg(&args, 0), len, 0);
            let end = relative(&arg(&args, 1), len, len);
            Ok(Val::array(if start < end {
                items[start..end].to_vec()
            } else {
                vec![]
            }))
        }
        "concat" => {
            let mut out = snapshot(a);
            for v in args {
                match v {
                    Val::Array(other) => out.extend(snapshot(&other)),
                    v => out.push(v),
                }
            }
            Ok(Val::array(out))
        }
        "flat" => {
            let mut out = vec![];
            for v in snapshot(a) {
                match v {
                    Val::Array(inner) => out.extend(snapshot(&inner)),
                    v => out.push(v),
                }
            }
            Ok(Val::array(out))
        }
        "fill" => {
            let value = arg(&args, 0);
            a.lock().unwrap().iter_mut().for_each(|v| *v = value.clone());
            Ok(this)
        }
        "join" => {
            let sep = match arg(&args, 0) {
                Val::Undefined => ",".to_string(),
                v => v.to_js_string(),
            };
            Ok(Val::Str(
                snapshot(a)
                    .iter()
                    .map(|v| match v {
                        Val::Undefined | Val::Null => String::new(),
                        v => v.to_js_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(&sep),
            ))
        }
        "indexOf" => {
            let needle = arg(&args, 0);
            let idx = snapshot(a).iter().position(|v| strict_eq(v, &needle));
            Ok(Val::Num(idx.map_or(-1.0, |i| i as f64)))
        }
        "includes" => {
            let needle = arg(&args, 0);
            let found = snapshot(a).iter().any(|v| match (v, &needle) {
                (Val::Num(x), Val::Num(y)) if x.is_nan() && y.is_nan() => true,
                _ => strict_eq(v, &needle),
            });
            Ok(Val::Bool(found))
        }
        "sort" => {
            let items = snapshot(a);
            let sorted = match arg(&args, 0) {
                f if f.is_callable() => merge_sort(items, &mut |x, y| {
                    let n = interp.call(&f, vec![x.clone(), y.clone()])?.to_number();
                    Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
                })?,
                Val::Undefined => merge_sort(items, &mut |x, y| Ok(default_order(x, y)))?,
                f => {
                    return Err(Error::Type(format!(
                        "The comparison function must be either a function or undefined: {}",
                        f.inspect()
                    )))
                }
            };
            *a.lock().unwrap() = sorted;
            Ok(this)
        }
        "reverse" => {
            a.lock().unwrap().reverse();
            Ok(this)
        }
        _ => Err(Error::Type(format!("{name} is not a function"))),
    }
}

/// Ordering used by `sort()` without a comparator: string order, undefined last
fn default_order<T: Extern>(x: &Val<T>, y: &Val<T>) -> Ordering {
    match (x, y) {
        (Val::Undefined, Val::Undefined) => Ordering::Equal,
        (Val::Undefined, _) => Ordering::Greater,
        (_, Val::Undefined) => Ordering::Less,
        _ => x.to_js_string().cmp(&y.to_js_string()),
    }
}

type Comparator<'a, T> = dyn FnMut(&Val<T>, &Val<T>) -> Result<Ordering> + 'a;

/// Stable sort with a comparator that may fail
fn merge_sort<T: Extern>(mut items: Vec<Val<T>>, cmp: &mut Comparator<'_, T>) -> Result<Vec<Val<T>>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if cmp(l, r)? == Ordering::Greater {
            out.extend(right.next());
        } else {
            out.extend(left.next());
        }
    }
    out.extend(left);
    out.extend(right);
    Ok(out)
}

fn from<T: Extern>(interp: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let src = arg(args, 0);
    let items = match &src {
        Val::Array(_) | Val::Str(_) => interp.iterate(&src)?,
        Val::Object(o) => {
            let len = o
                .lock()
                .unwrap()
                .get("length")
                .map_or(0.0, |v| v.to_number());
            let len = if len.is_nan() || len < 0.0 { 0 } else { len as usize };
            if len > MAX_LENGTH {
                return Err(Error::Range("Invalid array length".to_string()));
            }
            let entries = o.lock().unwrap();
            (0..len)
                .map(|i| entries.get(&i.to_string()).cloned().unwrap_or(Val::Undefined))
                .collect()
        }
        Val::Undefined | Val::Null => {
            return Err(Error::Type(format!("{src} is not iterable")));
        }
        _ => vec![],
    };

    match arg(args, 1) {
        Val::Undefined => Ok(Val::array(items)),
        f => {
            let mut out = Vec::with_capacity(items.len());
            for (i, v) in items.into_iter().enumerate() {
                out.push(interp.call(&f, vec![v, Val::Num(i as f64)])?);
            }
            Ok(Val::array(out))
        }
    }
}

fn is_array<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::Bool(matches!(arg(args, 0), Val::Array(_))))
}

fn of<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::array(args.to_vec()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use crate::Error;
    use void::Void;

    type Interp = crate::Interp<Void>;
    type Val = crate::Val<Void>;

    fn eval(text: &str) -> crate::Result<Val> {
        Interp::new().eval(text)
    }

    fn eval_str(text: &str) -> String {
        eval(text).unwrap().to_string()
    }

    #[test]
    fn higher_order() {
        assert_eq!(eval_str("return [1, 2, 3].map((d, i) => d * 10 + i)"), "10,21,32");
        assert_eq!(eval_str("return [1, 2, 3, 4].filter(d => d % 2 == 0)"), "2,4");
        assert_eq!(eval_str("return [1, 2, 3].reduce((a, b) => a + b)"), "6");
        assert_eq!(eval_str("return [{k: 'a'}, {k: 'b'}].find(d => d.k == 'b').k"), "b");
        assert_eq!(eval_str("return [1, 2].some(d => d > 1) && [1, 2].every(d => d > 0)"), "true");
    }

    #[test]
    fn reduce_empty() {
        assert_matches!(eval("return [].reduce((a, b) => a)"), Err(Error::Type(_)));
    }

    #[test]
    fn slicing() {
        assert_eq!(eval_str("return [1, 2, 3, 4].slice(1, 3)"), "2,3");
        assert_eq!(eval_str("return [1, 2, 3, 4].slice(-2)"), "3,4");
        assert_eq!(eval_str("return [1, 2].concat([3], 4)"), "1,2,3,4");
        assert_eq!(eval_str("return [1, null, 'x'].join('-')"), "1--x");
    }

    #[test]
    fn sorting() {
        assert_eq!(eval_str("return [10, 9, 1].sort()"), "1,10,9");
        assert_eq!(eval_str("return [10, 9, 1].sort((a, b) => a - b)"), "1,9,10");
        assert_eq!(
            eval_str(
                "const d = [{n: 'b', v: 1}, {n: 'a', v: 1}, {n: 'c', v: 0}];
                 return d.sort((x, y) => x.v - y.v).map(x => x.n).join('')"
            ),
            "cba"
        );
    }

    #[test]
    fn sort_comparator_throws() {
        assert_eq!(
            eval("return [2, 1].sort(() => { throw new Error('cmp') })"),
            Err(Error::Thrown("cmp".to_string()))
        );
    }

    #[test]
    fn mutation() {
        assert_eq!(
            eval_str("const a = [1]; a.push(2, 3); a.unshift(0); a.reverse(); return a"),
            "3,2,1,0"
        );
        assert_eq!(eval_str("const a = [1, 2]; return [a.pop(), a.length]"), "2,1");
    }

    #[test]
    fn array_from() {
        assert_eq!(eval_str("return Array.from({length: 3}, (_, i) => i * i)"), "0,1,4");
        assert_eq!(eval_str("return Array.from('abc')"), "a,b,c");
        assert_eq!(eval_str("return Array.isArray([]) && !Array.isArray({})"), "true");
    }

    #[test]
    fn search() {
        assert_eq!(eval_str("return [1, 2, 3].indexOf(2)"), "1");
        assert_eq!(eval_str("return [1, 2, 3].indexOf(7)"), "-1");
        assert_eq!(eval_str("return [NaN].includes(NaN)"), "true");
    }
}
