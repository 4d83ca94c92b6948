//! `Promise` constructor, statics, and methods
use crate::promise::{not_a_promise, to_promise};
use crate::{arg, Error, Extern, Interp, Promise, Result, Settled, Val};
use std::sync::{Arc, Mutex};

pub const METHODS: &[&str] = &["then", "catch", "finally"];

/// `new Promise((resolve, reject) => ...)`
pub(crate) fn constructor<T: Extern>(interp: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let executor = arg(args, 0);
    if !executor.is_callable() {
        return Err(Error::Type("Promise resolver is not a function".to_string()));
    }
    let promise = Promise::new();
    let (resolve, reject) = promise.resolving_functions("$resolve", "$reject");
    match interp.call(&executor, vec![resolve, reject]) {
        Ok(_) => (),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            let reason = interp.error_to_val(e);
            promise.reject(interp, reason);
        }
    }
    Ok(Val::Promise(promise))
}

pub(crate) fn static_member<T: Extern>(key: &str) -> Option<Val<T>> {
    let val = match key {
        "resolve" => Val::native("resolve", |interp, args| {
            Ok(Val::Promise(to_promise(interp, arg(args, 0))?))
        }),
        "reject" => Val::native("reject", |_, args| {
            Ok(Val::Promise(Promise::rejected(arg(args, 0))))
        }),
        "all" => Val::native("all", all),
        _ => return None,
    };
    Some(val)
}

/// Handler argument, ignoring non-callables
fn handler<T: Extern>(args: &[Val<T>], idx: usize) -> Option<Val<T>> {
    Some(arg(args, idx)).filter(Val::is_callable)
}

/// Call method `name` on promise
pub(crate) fn call<T: Extern>(
    interp: &mut Interp<T>,
    p: &Promise<T>,
    name: &str,
    args: Vec<Val<T>>,
) -> Result<Val<T>> {
    let result = match name {
        "then" => Val::Promise(p.then(interp, handler(&args, 0), handler(&args, 1))),
        "catch" => Val::Promise(p.then(interp, None, handler(&args, 0))),
        "finally" => match handler(&args, 0) {
            Some(f) => Val::Promise(p.finally(interp, f)),
            None => Val::Promise(p.then(interp, None, None)),
        },
        "$resolve" => {
            p.resolve(interp, arg(&args, 0))?;
            Val::Undefined
        }
        "$reject" => {
            p.reject(interp, arg(&args, 0));
            Val::Undefined
        }
        "$adopt_resolve" => {
            p.adopt(interp, Settled::Fulfilled(arg(&args, 0)))?;
            Val::Undefined
        }
        "$adopt_reject" => {
            p.adopt(interp, Settled::Rejected(arg(&args, 0)))?;
            Val::Undefined
        }
        _ => return Err(not_a_promise(name)),
    };
    Ok(result)
}

/// `Promise.all(values)`, fulfilling with results in input order
fn all<T: Extern>(interp: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let items = interp.iterate(&arg(args, 0))?;
    let out = Promise::new();
    if items.is_empty() {
        out.resolve(interp, Val::array(vec![]))?;
        return Ok(Val::Promise(out));
    }

    let results = Arc::new(Mutex::new(vec![Val::Undefined; items.len()]));
    let remaining = Arc::new(Mutex::new(items.len()));
    for (idx, item) in items.into_iter().enumerate() {
        let p = to_promise(interp, item)?;
        let out = out.clone();
        let results = results.clone();
        let remaining = remaining.clone();
        p.on_settle(interp, move |interp, outcome| match outcome {
            Settled::Fulfilled(v) => {
                results.lock().unwrap()[idx] = v;
                let done = {
                    let mut remaining = remaining.lock().unwrap();
                    *remaining -= 1;
                    *remaining == 0
                };
                if done {
                    let values = results.lock().unwrap().clone();
                    // array values never adopt, so resolution cannot fail
                    let _ = out.resolve(interp, Val::array(values));
                }
            }
            Settled::Rejected(r) => out.reject(interp, r),
        });
    }
    Ok(Val::Promise(out))
}

#[cfg(test)]
mod tests {
    use crate::{Error, Settled};
    use assert_matches::assert_matches;
    use void::Void;

    type Interp = crate::Interp<Void>;
    type Val = crate::Val<Void>;

    fn settle(text: &str) -> Settled<Void> {
        let mut interp = Interp::new();
        let Val::Promise(p) = interp.eval(text).unwrap() else {
            panic!("expected promise");
        };
        p.settled().expect("settled after jobs run")
    }

    #[test]
    fn executor_resolves() {
        assert_eq!(
            settle("return new Promise((resolve) => resolve(42))"),
            Settled::Fulfilled(Val::Num(42.0))
        );
    }

    #[test]
    fn executor_throw_rejects() {
        assert_matches!(
            settle("return new Promise(() => { throw new Error('bad data') })"),
            Settled::Rejected(Val::Error(e)) if e.message == "bad data"
        );
    }

    #[test]
    fn first_settlement_wins() {
        assert_eq!(
            settle("return new Promise((resolve, reject) => { resolve(1); reject(2); resolve(3) })"),
            Settled::Fulfilled(Val::Num(1.0))
        );
    }

    #[test]
    fn chaining() {
        assert_eq!(
            settle("return Promise.resolve(2).then(x => x * 10).then(x => x + 1)"),
            Settled::Fulfilled(Val::Num(21.0))
        );
        assert_eq!(
            settle("return Promise.reject('x').catch(e => e + '!')"),
            Settled::Fulfilled(Val::string("x!"))
        );
        assert_eq!(
            settle("let seen = 0; return Promise.resolve(5).finally(() => { seen = 1 }).then(v => v + seen)"),
            Settled::Fulfilled(Val::Num(6.0))
        );
    }

    #[test]
    fn adopts_thenable() {
        assert_eq!(
            settle("return Promise.resolve({ then(ok) { ok('from thenable') } })"),
            Settled::Fulfilled(Val::string("from thenable"))
        );
    }

    #[test]
    fn all_preserves_order() {
        assert_eq!(
            settle("return Promise.all([Promise.resolve(1), 2, new Promise(r => r(3))]).then(v => v.join(','))"),
            Settled::Fulfilled(Val::string("1,2,3"))
        );
        assert_matches!(
            settle("return Promise.all([1, Promise.reject('no')])"),
            Settled::Rejected(Val::Str(s)) if s == "no"
        );
    }

    #[test]
    fn resolver_must_be_callable() {
        assert_matches!(
            Interp::new().eval("return new Promise(1)"),
            Err(Error::Type(m)) if m == "Promise resolver is not a function"
        );
    }
}
