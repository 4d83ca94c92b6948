//! The `Math` namespace
use crate::{arg, Extern, Interp, Result, Val};
use rand::Rng;

/// Native wrapping a one argument numeric function
macro_rules! unary {
    ($name:literal, $f:expr) => {
        Val::native($name, |_, args| {
            let f: fn(f64) -> f64 = $f;
            Ok(Val::Num(f(arg(args, 0).to_number())))
        })
    };
}

pub fn namespace<T: Extern>() -> Val<T> {
    Val::object([
        ("PI", Val::Num(std::f64::consts::PI)),
        ("E", Val::Num(std::f64::consts::E)),
        ("SQRT2", Val::Num(std::f64::consts::SQRT_2)),
        ("LN10", Val::Num(std::f64::consts::LN_10)),
        ("random", Val::native("random", random)),
        ("floor", unary!("floor", f64::floor)),
        ("ceil", unary!("ceil", f64::ceil)),
        ("round", unary!("round", |x| (x + 0.5).floor())),
        ("trunc", unary!("trunc", f64::trunc)),
        ("abs", unary!("abs", f64::abs)),
        ("sign", unary!("sign", |x| if x.is_nan() || x == 0.0 { x } else { x.signum() })),
        ("sqrt", unary!("sqrt", f64::sqrt)),
        ("cbrt", unary!("cbrt", f64::cbrt)),
        ("exp", unary!("exp", f64::exp)),
        ("log", unary!("log", f64::ln)),
        ("log10", unary!("log10", f64::log10)),
        ("log2", unary!("log2", f64::log2)),
        ("sin", unary!("sin", f64::sin)),
        ("cos", unary!("cos", f64::cos)),
        ("tan", unary!("tan", f64::tan)),
        ("asin", unary!("asin", f64::asin)),
        ("acos", unary!("acos", f64::acos)),
        ("atan", unary!("atan", f64::atan)),
        ("atan2", Val::native("atan2", atan2)),
        ("pow", Val::native("pow", pow)),
        ("hypot", Val::native("hypot", hypot)),
        ("min", Val::native("min", min)),
        ("max", Val::native("max", max)),
    ])
}

fn random<T: Extern>(_: &mut Interp<T>, _: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::Num(rand::thread_rng().gen::<f64>()))
}

fn atan2<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let y = arg(args, 0).to_number();
    let x = arg(args, 1).to_number();
    Ok(Val::Num(y.atan2(x)))
}

fn pow<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let base = arg(args, 0).to_number();
    let exp = arg(args, 1).to_number();
    Ok(Val::Num(base.powf(exp)))
}

fn hypot<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    Ok(Val::Num(
        args.iter().map(|v| v.to_number().powi(2)).sum::<f64>().sqrt(),
    ))
}

fn min<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let mut acc = f64::INFINITY;
    for v in args {
        let n = v.to_number();
        if n.is_nan() {
            return Ok(Val::Num(f64::NAN));
        }
        acc = acc.min(n);
    }
    Ok(Val::Num(acc))
}

fn max<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let mut acc = f64::NEG_INFINITY;
    for v in args {
        let n = v.to_number();
        if n.is_nan() {
            return Ok(Val::Num(f64::NAN));
        }
        acc = acc.max(n);
    }
    Ok(Val::Num(acc))
}
