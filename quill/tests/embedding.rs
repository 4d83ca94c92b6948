//! Tests for embedding in host application

use assert_matches::assert_matches;
use quill::{compile, Error, Promise, Result, Settled};
use std::sync::{Arc, Mutex};

type Interp = quill::Interp<Ext>;
type Val = quill::Val<Ext>;

/// Host values exposed to programs
#[derive(Debug, Clone)]
enum Ext {
    /// Shared tally with `value` property and `add` method
    Counter(Arc<Mutex<i32>>),
    /// Callable that doubles its argument
    Doubler,
}

impl PartialEq for Ext {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ext::Counter(a), Ext::Counter(b)) => Arc::ptr_eq(a, b),
            (Ext::Doubler, Ext::Doubler) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for Ext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", quill::Extern::type_name(self))
    }
}

impl quill::Extern for Ext {
    fn type_name(&self) -> &'static str {
        match self {
            Ext::Counter(_) => "Counter",
            Ext::Doubler => "Doubler",
        }
    }

    fn get(&self, key: &str) -> Option<Val> {
        match (self, key) {
            (Ext::Counter(n), "value") => Some(Val::Num(*n.lock().unwrap() as f64)),
            _ => None,
        }
    }

    fn has_method(&self, name: &str) -> bool {
        matches!((self, name), (Ext::Counter(_), "add"))
    }

    fn call_method(&self, _interp: &mut Interp, name: &str, args: Vec<Val>) -> Result<Val> {
        match (self, name) {
            (Ext::Counter(n), "add") => {
                *n.lock().unwrap() += quill::arg(&args, 0).to_number() as i32;
                Ok(Val::Extern(self.clone()))
            }
            _ => Err(Error::Type(format!("{name} is not a function"))),
        }
    }

    fn is_callable(&self) -> bool {
        matches!(self, Ext::Doubler)
    }

    fn call(&self, _interp: &mut Interp, args: Vec<Val>) -> Result<Val> {
        Ok(Val::Num(quill::arg(&args, 0).to_number() * 2.0))
    }
}

#[test]
fn invoke_with_host_values() {
    let counter = Arc::new(Mutex::new(0));
    let snippet = compile("counter.add(2).add(3); return counter.value", &["counter"]).unwrap();
    let mut interp = Interp::new();
    assert_eq!(
        snippet.invoke(&mut interp, vec![Val::Extern(Ext::Counter(counter.clone()))]),
        Ok(Val::Num(5.0))
    );
    assert_eq!(*counter.lock().unwrap(), 5);
}

#[test]
fn callable_extern() {
    let mut interp = Interp::new();
    interp.define_global("double", Val::Extern(Ext::Doubler));
    assert_eq!(interp.eval("return [1, 2].map(double)"), Ok(Val::array(vec![Val::Num(2.0), Val::Num(4.0)])));
    assert_eq!(interp.eval("return typeof double"), Ok(Val::string("function")));
}

#[test]
fn extern_properties_are_read_only() {
    let mut interp = Interp::new();
    interp.define_global("counter", Val::Extern(Ext::Counter(Arc::default())));
    assert_matches!(interp.eval("counter.value = 3"), Err(Error::Type(_)));
    assert_matches!(interp.eval("counter.nope()"), Err(Error::Type(_)));
}

#[test]
fn params_shadowed_by_declarations() {
    let snippet = compile("const width = 10; return width", &["width"]).unwrap();
    let mut interp = Interp::new();
    assert_eq!(snippet.invoke(&mut interp, vec![Val::Num(928.0)]), Ok(Val::Num(10.0)));
}

#[test]
fn host_observes_settlement_once() {
    let mut interp = Interp::new();
    let snippet = compile(
        "return new Promise((resolve) => { resolve(counter.add(1)); resolve('again') })",
        &["counter"],
    )
    .unwrap();
    let counter = Ext::Counter(Arc::default());
    let Ok(Val::Promise(p)) = snippet.invoke(&mut interp, vec![Val::Extern(counter.clone())]) else {
        panic!("expected a promise");
    };

    let seen = Arc::new(Mutex::new(vec![]));
    let sink = seen.clone();
    p.on_settle(&mut interp, move |_, outcome| sink.lock().unwrap().push(outcome));
    interp.run_jobs().unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Settled::Fulfilled(Val::Extern(counter))]
    );
}

#[test]
fn host_settles_program_promise() {
    let mut interp = Interp::new();
    let pending: Promise<Ext> = Promise::new();
    interp.define_global("ready", Val::Promise(pending.clone()));
    let Val::Promise(derived) = interp.eval("return ready.then(v => v + 1)").unwrap() else {
        panic!("expected a promise");
    };
    assert!(derived.is_pending());

    pending.resolve(&mut interp, Val::Num(41.0)).unwrap();
    interp.run_jobs().unwrap();
    assert_eq!(derived.settled(), Some(Settled::Fulfilled(Val::Num(42.0))));
}

#[test]
fn budget_applies_to_reactions() {
    let mut interp = Interp::new().with_step_limit(500);
    assert_eq!(
        interp.eval("Promise.resolve(1).then(() => { while (true) {} })"),
        Err(Error::StepLimit)
    );
}
