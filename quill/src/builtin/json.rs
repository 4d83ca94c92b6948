//! The `JSON` namespace, backed by serde_json
use crate::types::fmt_date;
use crate::{arg, Error, Extern, Interp, Result, Val};
use serde_json::{Map, Number, Value};

pub fn namespace<T: Extern>() -> Val<T> {
    Val::object([
        ("stringify", Val::native("stringify", stringify)),
        ("parse", Val::native("parse", parse)),
    ])
}

/// Convert to JSON data, `None` for values JSON cannot represent
pub fn to_json<T: Extern>(v: &Val<T>) -> Option<Value> {
    let json = match v {
        Val::Undefined
        | Val::Func(_)
        | Val::Native(_)
        | Val::Method(_)
        | Val::Extern(_) => return None,
        Val::Null => Value::Null,
        Val::Bool(b) => Value::Bool(*b),
        Val::Num(n) if !n.is_finite() => Value::Null,
        Val::Num(n) if n.fract() == 0.0 && n.abs() < 9007199254740992.0 => {
            Value::Number(Number::from(*n as i64))
        }
        Val::Num(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        Val::Str(s) => Value::String(s.clone()),
        Val::Date(d) => Value::String(fmt_date(d)),
        Val::Array(a) => {
            let items = a.lock().unwrap().clone();
            Value::Array(
                items
                    .iter()
                    .map(|v| to_json(v).unwrap_or(Value::Null))
                    .collect(),
            )
        }
        Val::Object(o) => {
            let entries = o.lock().unwrap().clone();
            Value::Object(
                entries
                    .iter()
                    .filter_map(|(k, v)| to_json(v).map(|v| (k.clone(), v)))
                    .collect::<Map<_, _>>(),
            )
        }
        Val::Promise(_) | Val::Error(_) => Value::Object(Map::new()),
    };
    Some(json)
}

/// Convert JSON data into a value
pub fn from_json<T: Extern>(json: Value) -> Val<T> {
    match json {
        Value::Null => Val::Null,
        Value::Bool(b) => Val::Bool(b),
        Value::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => Val::Str(s),
        Value::Array(items) => Val::array(items.into_iter().map(from_json).collect()),
        Value::Object(map) => Val::Object(std::sync::Arc::new(std::sync::Mutex::new(
            map.into_iter().map(|(k, v)| (k, from_json(v))).collect(),
        ))),
    }
}

fn stringify<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let Some(json) = to_json(&arg(args, 0)) else {
        return Ok(Val::Undefined);
    };
    let indent = match arg(args, 2) {
        Val::Num(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Val::Str(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        let mut buf = vec![];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(&json, &mut ser)
            .map(|_| String::from_utf8_lossy(&buf).into_owned())
    };
    text.map(Val::Str)
        .map_err(|e| Error::Type(format!("Converting to JSON failed - {e}")))
}

fn parse<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let text = arg(args, 0).to_js_string();
    serde_json::from_str::<Value>(&text)
        .map(from_json)
        .map_err(|e| Error::Syntax(format!("JSON.parse: {e}")))
}

#[cfg(test)]
mod tests {
    use crate::Error;
    use assert_matches::assert_matches;
    use void::Void;

    type Interp = crate::Interp<Void>;
    type Val = crate::Val<Void>;

    fn eval(text: &str) -> crate::Result<Val> {
        Interp::new().eval(text)
    }

    #[test]
    fn stringify_preserves_order() {
        assert_eq!(
            eval("return JSON.stringify({letter: 'A', frequency: 0.08167, n: 3, skip: undefined})")
                .unwrap(),
            Val::string(r#"{"letter":"A","frequency":0.08167,"n":3}"#)
        );
        assert_eq!(
            eval("return JSON.stringify([1, undefined, NaN])").unwrap(),
            Val::string("[1,null,null]")
        );
        assert_eq!(eval("return JSON.stringify(undefined)").unwrap(), Val::Undefined);
    }

    #[test]
    fn stringify_indent() {
        assert_eq!(
            eval("return JSON.stringify({a: [1]}, null, 2)").unwrap(),
            Val::string("{\n  \"a\": [\n    1\n  ]\n}")
        );
    }

    #[test]
    fn parse_roundtrip_values() {
        assert_eq!(
            eval(r#"const o = JSON.parse('{"a": [1, 2], "b": "x"}'); return o.a[1] + o.b"#).unwrap(),
            Val::string("2x")
        );
        assert_matches!(eval("return JSON.parse('{oops')"), Err(Error::Syntax(_)));
    }
}
