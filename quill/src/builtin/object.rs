//! The `Object` namespace
use crate::{arg, Error, Extern, Interp, Result, Val};
use indexmap::IndexMap;

pub fn namespace<T: Extern>() -> Val<T> {
    Val::object([
        ("assign", Val::native("assign", assign)),
        ("keys", Val::native("keys", keys)),
        ("values", Val::native("values", values)),
        ("entries", Val::native("entries", entries)),
        ("fromEntries", Val::native("fromEntries", from_entries)),
        ("freeze", Val::native("freeze", identity)),
    ])
}

/// Own enumerable entries of a value
fn own_entries<T: Extern>(v: &Val<T>) -> Result<Vec<(String, Val<T>)>> {
    match v {
        Val::Undefined | Val::Null => Err(Error::Type(
            "Cannot convert undefined or null to object".to_string(),
        )),
        Val::Object(o) => Ok(o
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()),
        Val::Array(a) => Ok(a
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect()),
        Val::Str(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Val::Str(c.to_string())))
            .collect()),
        _ => Ok(vec![]),
    }
}

fn assign<T: Extern>(interp: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let target = arg(args, 0);
    if target.is_nullish() {
        return Err(Error::Type(
            "Cannot convert undefined or null to object".to_string(),
        ));
    }
    for source in args.iter().skip(1) {
        if source.is_nullish() {
            continue;
        }
        for (k, v) in own_entries(source)? {
            interp.set_member(&target, &k, v)?;
        }
    }
    Ok(target)
}

fn keys<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::array(
        own_entries(&arg(args, 0))?
            .into_iter()
            .map(|(k, _)| Val::Str(k))
            .collect(),
    ))
}

fn values<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::array(
        own_entries(&arg(args, 0))?
            .into_iter()
            .map(|(_, v)| v)
            .collect(),
    ))
}

fn entries<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::array(
        own_entries(&arg(args, 0))?
            .into_iter()
            .map(|(k, v)| Val::array(vec![Val::Str(k), v]))
            .collect(),
    ))
}

fn from_entries<T: Extern>(interp: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let mut map = IndexMap::new();
    for entry in interp.iterate(&arg(args, 0))? {
        let pair = interp.iterate(&entry)?;
        let key = pair.first().cloned().unwrap_or(Val::Undefined);
        let value = pair.get(1).cloned().unwrap_or(Val::Undefined);
        map.insert(key.to_property_key(), value);
    }
    Ok(Val::Object(std::sync::Arc::new(std::sync::Mutex::new(map))))
}

fn identity<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(arg(args, 0))
}

#[cfg(test)]
mod tests {
    use void::Void;

    type Interp = crate::Interp<Void>;

    fn eval_str(text: &str) -> String {
        Interp::new().eval(text).unwrap().to_string()
    }

    #[test]
    fn keys_in_insertion_order() {
        assert_eq!(eval_str("return Object.keys({b: 1, a: 2, c: 3})"), "b,a,c");
        assert_eq!(eval_str("return Object.values({b: 1, a: 2})"), "1,2");
        assert_eq!(
            eval_str("return Object.entries({x: 1}).map(([k, v]) => k + '=' + v)"),
            "x=1"
        );
    }

    #[test]
    fn assign_merges() {
        assert_eq!(
            eval_str(
                "const o = Object.assign({}, {top: 20}, {top: 30, left: 40});
                 return o.top + o.left"
            ),
            "70"
        );
    }

    #[test]
    fn from_entries() {
        assert_eq!(
            eval_str("return Object.fromEntries([['a', 1], ['b', 2]]).b"),
            "2"
        );
    }
}
