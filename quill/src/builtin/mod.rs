//! Standard globals available to every program
pub mod array;
pub mod date;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod promise;
pub mod string;

use crate::{arg, Env, Extern, Interp, Result, Val};
use tracing::info;

/// Create the root scope with standard globals
pub fn globals<T: Extern>() -> Env<T> {
    let mut env = Env::<T>::new();
    env.define("NaN", Val::Num(f64::NAN))
        .define("Infinity", Val::Num(f64::INFINITY))
        .define("Math", math::namespace())
        .define("JSON", json::namespace())
        .define("Object", object::namespace())
        .define("Array", array::namespace())
        .define("console", console())
        .define("Error", Val::native("Error", error_ctor))
        .define("TypeError", Val::native("TypeError", type_error_ctor))
        .define("RangeError", Val::native("RangeError", range_error_ctor))
        .define("Promise", Val::native("Promise", promise::constructor))
        .define("Date", Val::native("Date", date::constructor))
        .define("Number", Val::native("Number", number::constructor))
        .define("String", Val::native("String", string_fn))
        .define("Boolean", Val::native("Boolean", boolean_fn))
        .define("isNaN", Val::native("isNaN", is_nan))
        .define("parseFloat", Val::native("parseFloat", number::parse_float))
        .define("parseInt", Val::native("parseInt", number::parse_int));
    env
}

/// Static members of callable globals, e.g. `Promise.resolve`
pub(crate) fn native_static<T: Extern>(owner: &str, key: &str) -> Option<Val<T>> {
    match owner {
        "Promise" => promise::static_member(key),
        "Date" => date::static_member(key),
        "Number" => number::static_member(key),
        _ => None,
    }
}

fn console<T: Extern>() -> Val<T> {
    Val::object([
        ("log", Val::native("log", log)),
        ("info", Val::native("info", log)),
        ("warn", Val::native("warn", warn)),
        ("error", Val::native("error", warn)),
    ])
}

fn console_line<T: Extern>(args: &[Val<T>]) -> String {
    args.iter()
        .map(|v| match v {
            Val::Str(s) => s.clone(),
            v => v.inspect(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn log<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    info!(target: "quill::console", "{}", console_line(args));
    Ok(Val::Undefined)
}

fn warn<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    tracing::warn!(target: "quill::console", "{}", console_line(args));
    Ok(Val::Undefined)
}

fn make_error<T: Extern>(name: &str, args: &[Val<T>]) -> Val<T> {
    let message = match arg(args, 0) {
        Val::Undefined => String::new(),
        v => v.to_js_string(),
    };
    Val::error(name, &message)
}

fn error_ctor<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(make_error("Error", args))
}

fn type_error_ctor<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(make_error("TypeError", args))
}

fn range_error_ctor<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(make_error("RangeError", args))
}

fn string_fn<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(match args.first() {
        Some(v) => Val::Str(v.to_js_string()),
        None => Val::string(""),
    })
}

fn boolean_fn<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::Bool(arg(args, 0).truthy()))
}

fn is_nan<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::Bool(arg(args, 0).to_number().is_nan()))
}
