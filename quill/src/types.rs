//! Values manipulated by the interpreter
use crate::ast::Function;
use crate::{EnvRef, Error, Interp, Promise, Result};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

/// Shared, mutable array storage
pub type ArrayRef<T> = Arc<Mutex<Vec<Val<T>>>>;

/// Shared, mutable object storage with insertion-ordered keys
pub type ObjectRef<T> = Arc<Mutex<IndexMap<String, Val<T>>>>;

/// All values a snippet can manipulate
#[derive(Debug, Clone)]
pub enum Val<T: Extern> {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(ArrayRef<T>),
    Object(ObjectRef<T>),
    /// A function closing over the scope it was created in
    Func(Closure<T>),
    /// A function implemented by the host
    Native(NativeFn<T>),
    /// A method looked up on a receiver, e.g. `data.map`
    Method(Arc<BoundMethod<T>>),
    Promise(Promise<T>),
    Error(ErrorObj),
    Date(NaiveDateTime),
    /// Embedder defined value
    Extern(T),
}

/// A function object that closes over the environment it was created in
#[derive(Clone)]
pub struct Closure<T: Extern> {
    pub func: Arc<Function>,
    pub env: EnvRef<T>,
}

/// A native function
#[allow(clippy::type_complexity)]
#[derive(Clone)]
pub struct NativeFn<T: Extern> {
    pub name: &'static str,
    pub func: fn(&mut Interp<T>, &[Val<T>]) -> Result<Val<T>>,
}

/// A method name paired with the value it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct BoundMethod<T: Extern> {
    pub recv: Val<T>,
    pub name: String,
}

/// Error objects created with `new Error(..)` or raised by the interpreter
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorObj {
    pub name: String,
    pub message: String,
}

/// Host defined types that live inside [Val]
///
/// Only [Extern::type_name] is required. Property access, assignment, method calls, and
/// direct calls default to behaving like an inert object.
pub trait Extern:
    Sized + Clone + PartialEq + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static
{
    /// Name used in error messages
    fn type_name(&self) -> &'static str;

    /// Read a data property
    fn get(&self, _key: &str) -> Option<Val<Self>> {
        None
    }

    /// Assign a data property
    fn set(&self, key: &str, _value: Val<Self>) -> Result<()> {
        Err(Error::Type(format!(
            "Cannot assign to property '{key}' of {}",
            self.type_name()
        )))
    }

    /// Whether or not `name` is a method on this value
    fn has_method(&self, _name: &str) -> bool {
        false
    }

    /// Call method `name`
    fn call_method(
        &self,
        _interp: &mut Interp<Self>,
        name: &str,
        _args: Vec<Val<Self>>,
    ) -> Result<Val<Self>> {
        Err(Error::Type(format!(
            "{}.{name} is not a function",
            self.type_name()
        )))
    }

    /// Whether or not value can be called directly
    fn is_callable(&self) -> bool {
        false
    }

    /// Call the value directly
    fn call(&self, _interp: &mut Interp<Self>, _args: Vec<Val<Self>>) -> Result<Val<Self>> {
        Err(Error::Type(format!("{} is not a function", self.type_name())))
    }
}

impl<T: Extern> Val<T> {
    /// Shorthand for constructing [Val::Str]
    pub fn string(s: &str) -> Self {
        Self::Str(String::from(s))
    }

    /// Shorthand for constructing [Val::Array]
    pub fn array(items: Vec<Val<T>>) -> Self {
        Self::Array(Arc::new(Mutex::new(items)))
    }

    /// Shorthand for constructing [Val::Object] from key value pairs
    pub fn object<'a>(entries: impl IntoIterator<Item = (&'a str, Val<T>)>) -> Self {
        Self::Object(Arc::new(Mutex::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )))
    }

    /// Shorthand for constructing [Val::Native]
    pub fn native(name: &'static str, func: fn(&mut Interp<T>, &[Val<T>]) -> Result<Val<T>>) -> Self {
        Self::Native(NativeFn { name, func })
    }

    /// Shorthand for constructing an error object
    pub fn error(name: &str, message: &str) -> Self {
        Self::Error(ErrorObj {
            name: name.to_string(),
            message: message.to_string(),
        })
    }

    /// Whether or not value is `undefined` or `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Val::Undefined | Val::Null)
    }

    /// Whether or not value can be called
    pub fn is_callable(&self) -> bool {
        match self {
            Val::Func(_) | Val::Native(_) | Val::Method(_) => true,
            Val::Extern(e) => e.is_callable(),
            _ => false,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Val::Undefined | Val::Null => false,
            Val::Bool(b) => *b,
            Val::Num(n) => !(*n == 0.0 || n.is_nan()),
            Val::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Result of `typeof`
    pub fn type_of(&self) -> &'static str {
        match self {
            Val::Undefined => "undefined",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::Func(_) | Val::Native(_) | Val::Method(_) => "function",
            Val::Extern(e) if e.is_callable() => "function",
            _ => "object",
        }
    }

    /// Numeric conversion, as with unary `+`
    pub fn to_number(&self) -> f64 {
        match self {
            Val::Undefined => f64::NAN,
            Val::Null => 0.0,
            Val::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Val::Num(n) => *n,
            Val::Str(s) => parse_number(s),
            Val::Array(a) => {
                let items = a.lock().unwrap();
                match items.as_slice() {
                    [] => 0.0,
                    [item] => item.to_number(),
                    _ => f64::NAN,
                }
            }
            Val::Date(d) => d.and_utc().timestamp_millis() as f64,
            _ => f64::NAN,
        }
    }

    /// String conversion, as with `String(value)` or template literals
    pub fn to_js_string(&self) -> String {
        match self {
            Val::Undefined => "undefined".to_string(),
            Val::Null => "null".to_string(),
            Val::Bool(b) => b.to_string(),
            Val::Num(n) => fmt_num(*n),
            Val::Str(s) => s.clone(),
            Val::Array(a) => a
                .lock()
                .unwrap()
                .iter()
                .map(|v| match v {
                    Val::Undefined | Val::Null => String::new(),
                    v => v.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Val::Object(_) => "[object Object]".to_string(),
            Val::Func(c) => format!("function {}() {{ ... }}", c.func.name.as_deref().unwrap_or("")),
            Val::Native(n) => format!("function {}() {{ [native code] }}", n.name),
            Val::Method(m) => format!("function {}() {{ [native code] }}", m.name),
            Val::Promise(_) => "[object Promise]".to_string(),
            Val::Error(e) if e.message.is_empty() => e.name.clone(),
            Val::Error(e) => format!("{}: {}", e.name, e.message),
            Val::Date(d) => fmt_date(d),
            Val::Extern(e) => e.to_string(),
        }
    }

    /// Developer facing representation, as printed by `console.log`
    pub fn inspect(&self) -> String {
        match self {
            Val::Str(s) => format!("'{s}'"),
            Val::Array(a) => {
                let items = a.lock().unwrap().clone();
                format!(
                    "[{}]",
                    items.iter().map(Val::inspect).collect::<Vec<_>>().join(", ")
                )
            }
            Val::Object(o) => {
                let entries = o.lock().unwrap().clone();
                if entries.is_empty() {
                    return "{}".to_string();
                }
                format!(
                    "{{ {} }}",
                    entries
                        .iter()
                        .map(|(k, v)| format!("{k}: {}", v.inspect()))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Val::Func(c) => format!("[Function: {}]", c.func.name.as_deref().unwrap_or("(anonymous)")),
            Val::Native(n) => format!("[Function: {}]", n.name),
            Val::Method(m) => format!("[Function: {}]", m.name),
            Val::Promise(p) => format!("Promise {{ <{}> }}", p.state_name()),
            v => v.to_js_string(),
        }
    }

    /// Key used when value indexes an object
    pub fn to_property_key(&self) -> String {
        self.to_js_string()
    }
}

impl<T: Extern> PartialEq for Val<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Undefined, Val::Undefined) | (Val::Null, Val::Null) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Num(a), Val::Num(b)) => a == b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Array(a), Val::Array(b)) => Arc::ptr_eq(a, b),
            (Val::Object(a), Val::Object(b)) => Arc::ptr_eq(a, b),
            (Val::Func(a), Val::Func(b)) => a == b,
            (Val::Native(a), Val::Native(b)) => a.name == b.name,
            (Val::Method(a), Val::Method(b)) => a == b,
            (Val::Promise(a), Val::Promise(b)) => a == b,
            (Val::Error(a), Val::Error(b)) => a == b,
            (Val::Date(a), Val::Date(b)) => a == b,
            (Val::Extern(a), Val::Extern(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: Extern> std::fmt::Display for Val<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_js_string())
    }
}

impl<T: Extern> PartialEq for Closure<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func) && Arc::ptr_eq(&self.env, &other.env)
    }
}

impl<T: Extern> std::fmt::Debug for Closure<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // env may contain this closure
        write!(
            f,
            "Closure({}/{})",
            self.func.name.as_deref().unwrap_or("anonymous"),
            self.func.params.len()
        )
    }
}

impl<T: Extern> std::fmt::Debug for NativeFn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

impl<T: Extern> From<f64> for Val<T> {
    fn from(value: f64) -> Self {
        Val::Num(value)
    }
}

impl<T: Extern> From<bool> for Val<T> {
    fn from(value: bool) -> Self {
        Val::Bool(value)
    }
}

impl<T: Extern> From<&str> for Val<T> {
    fn from(value: &str) -> Self {
        Val::string(value)
    }
}

impl<T: Extern> From<String> for Val<T> {
    fn from(value: String) -> Self {
        Val::Str(value)
    }
}

/// Argument at `idx`, or `undefined` when missing
pub fn arg<T: Extern>(args: &[Val<T>], idx: usize) -> Val<T> {
    args.get(idx).cloned().unwrap_or(Val::Undefined)
}

/// Format numbers the way snippets expect to see them, e.g. `3` rather than `3.0`
pub fn fmt_num(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{n}")
    }
}

/// ISO 8601 form with millisecond precision
pub fn fmt_date(d: &NaiveDateTime) -> String {
    d.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parse string contents as a number, `NaN` when malformed
pub fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if s.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) => {
            s.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/// Equality for `===`
pub fn strict_eq<T: Extern>(a: &Val<T>, b: &Val<T>) -> bool {
    match (a, b) {
        (Val::Error(_), Val::Error(_)) | (Val::Date(_), Val::Date(_)) => false,
        _ => a == b,
    }
}

/// Equality for `==`
pub fn loose_eq<T: Extern>(a: &Val<T>, b: &Val<T>) -> bool {
    match (a, b) {
        (Val::Undefined | Val::Null, Val::Undefined | Val::Null) => true,
        (Val::Undefined | Val::Null, _) | (_, Val::Undefined | Val::Null) => false,
        (Val::Num(_), Val::Str(_))
        | (Val::Str(_), Val::Num(_))
        | (Val::Bool(_), _)
        | (_, Val::Bool(_)) => a.to_number() == b.to_number(),
        (Val::Date(x), Val::Date(y)) => x == y,
        (Val::Array(_) | Val::Object(_) | Val::Date(_), Val::Num(_) | Val::Str(_))
        | (Val::Num(_) | Val::Str(_), Val::Array(_) | Val::Object(_) | Val::Date(_)) => {
            a.to_js_string() == b.to_js_string()
        }
        _ => strict_eq(a, b),
    }
}
