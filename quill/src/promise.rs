//! Single-settlement promises with reactions delivered through the job queue
use crate::types::BoundMethod;
use crate::{Error, Extern, Interp, Result, Val};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A value that settles later, at most once
pub struct Promise<T: Extern>(Arc<Mutex<State<T>>>);

enum State<T: Extern> {
    Pending {
        reactions: Vec<Reaction<T>>,
        /// Set once resolved with another promise or then-able
        locked: bool,
    },
    Fulfilled(Val<T>),
    Rejected(Val<T>),
}

/// Outcome of a settled promise
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T: Extern> {
    Fulfilled(Val<T>),
    Rejected(Val<T>),
}

/// Continuation invoked by the host once a promise settles
pub type HostReaction<T> = Box<dyn FnOnce(&mut Interp<T>, Settled<T>) + Send>;

/// Work registered against a promise
pub(crate) enum Reaction<T: Extern> {
    Then {
        on_ok: Option<Val<T>>,
        on_err: Option<Val<T>>,
        next: Promise<T>,
    },
    Finally {
        f: Val<T>,
        next: Promise<T>,
    },
    Host(HostReaction<T>),
}

/// Pending unit of work on the interpreter's job queue
pub(crate) enum Job<T: Extern> {
    React(Reaction<T>, Settled<T>),
    /// Resolve `promise` by calling a foreign then-able's `then`
    Adopt {
        promise: Promise<T>,
        then: Val<T>,
    },
}

impl<T: Extern> Settled<T> {
    pub fn value(&self) -> &Val<T> {
        match self {
            Settled::Fulfilled(v) | Settled::Rejected(v) => v,
        }
    }
}

impl<T: Extern> Promise<T> {
    /// Create a pending promise
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(State::Pending {
            reactions: vec![],
            locked: false,
        })))
    }

    /// Create a promise already fulfilled with value
    pub fn fulfilled(value: Val<T>) -> Self {
        Self(Arc::new(Mutex::new(State::Fulfilled(value))))
    }

    /// Create a promise already rejected with reason
    pub fn rejected(reason: Val<T>) -> Self {
        Self(Arc::new(Mutex::new(State::Rejected(reason))))
    }

    /// Settled outcome, if any
    pub fn settled(&self) -> Option<Settled<T>> {
        match &*self.0.lock().unwrap() {
            State::Pending { .. } => None,
            State::Fulfilled(v) => Some(Settled::Fulfilled(v.clone())),
            State::Rejected(v) => Some(Settled::Rejected(v.clone())),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.settled().is_none()
    }

    pub(crate) fn state_name(&self) -> &'static str {
        match &*self.0.lock().unwrap() {
            State::Pending { .. } => "pending",
            State::Fulfilled(_) => "fulfilled",
            State::Rejected(_) => "rejected",
        }
    }

    /// Resolve with value, adopting the state of promises and then-ables.
    /// Ignored if already resolved.
    pub fn resolve(&self, interp: &mut Interp<T>, value: Val<T>) -> Result<()> {
        if self.lock_in() {
            self.resolve_locked(interp, value)?;
        }
        Ok(())
    }

    /// Reject with reason. Ignored if already resolved.
    pub fn reject(&self, interp: &mut Interp<T>, reason: Val<T>) {
        if self.lock_in() {
            self.settle(interp, Settled::Rejected(reason));
        }
    }

    /// Register a continuation that runs exactly once, after settlement, from the job queue
    pub fn on_settle(
        &self,
        interp: &mut Interp<T>,
        f: impl FnOnce(&mut Interp<T>, Settled<T>) + Send + 'static,
    ) {
        self.react(interp, Reaction::Host(Box::new(f)));
    }

    /// Chain handlers, returning the derived promise
    pub fn then(
        &self,
        interp: &mut Interp<T>,
        on_ok: Option<Val<T>>,
        on_err: Option<Val<T>>,
    ) -> Promise<T> {
        let next = Promise::new();
        self.react(
            interp,
            Reaction::Then {
                on_ok,
                on_err,
                next: next.clone(),
            },
        );
        next
    }

    /// Run `f` on settlement, passing the outcome through
    pub fn finally(&self, interp: &mut Interp<T>, f: Val<T>) -> Promise<T> {
        let next = Promise::new();
        self.react(
            interp,
            Reaction::Finally {
                f,
                next: next.clone(),
            },
        );
        next
    }

    /// Mark as resolved, returning false if it already was
    fn lock_in(&self) -> bool {
        match &mut *self.0.lock().unwrap() {
            State::Pending { locked, .. } if !*locked => {
                *locked = true;
                true
            }
            _ => false,
        }
    }

    fn resolve_locked(&self, interp: &mut Interp<T>, value: Val<T>) -> Result<()> {
        if let Val::Promise(p) = &value {
            if p == self {
                let reason = Val::error("TypeError", "Chaining cycle detected for promise");
                self.settle(interp, Settled::Rejected(reason));
            } else {
                p.react(
                    interp,
                    Reaction::Then {
                        on_ok: None,
                        on_err: None,
                        next: self.clone(),
                    },
                );
            }
            return Ok(());
        }

        match then_of(interp, &value) {
            Ok(Some(then)) => interp.enqueue(Job::Adopt {
                promise: self.clone(),
                then,
            }),
            Ok(None) => self.settle(interp, Settled::Fulfilled(value)),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                let reason = interp.error_to_val(e);
                self.settle(interp, Settled::Rejected(reason));
            }
        }
        Ok(())
    }

    /// Transition out of pending and schedule registered reactions
    fn settle(&self, interp: &mut Interp<T>, outcome: Settled<T>) {
        let reactions = {
            let mut state = self.0.lock().unwrap();
            let reactions = match &mut *state {
                State::Pending { reactions, .. } => std::mem::take(reactions),
                _ => return,
            };
            *state = match &outcome {
                Settled::Fulfilled(v) => State::Fulfilled(v.clone()),
                Settled::Rejected(v) => State::Rejected(v.clone()),
            };
            reactions
        };
        for reaction in reactions {
            interp.enqueue(Job::React(reaction, outcome.clone()));
        }
    }

    fn react(&self, interp: &mut Interp<T>, reaction: Reaction<T>) {
        let outcome = {
            let mut state = self.0.lock().unwrap();
            match &mut *state {
                State::Pending { reactions, .. } => {
                    reactions.push(reaction);
                    return;
                }
                State::Fulfilled(v) => Settled::Fulfilled(v.clone()),
                State::Rejected(v) => Settled::Rejected(v.clone()),
            }
        };
        interp.enqueue(Job::React(reaction, outcome));
    }

    /// Function values that settle this promise, as passed to an executor
    pub(crate) fn resolving_functions(&self, resolve: &str, reject: &str) -> (Val<T>, Val<T>) {
        let bind = |name: &str| {
            Val::Method(Arc::new(BoundMethod {
                recv: Val::Promise(self.clone()),
                name: name.to_string(),
            }))
        };
        (bind(resolve), bind(reject))
    }

    /// Resolution used by adoption, bypassing the resolved flag
    pub(crate) fn adopt(&self, interp: &mut Interp<T>, outcome: Settled<T>) -> Result<()> {
        match outcome {
            Settled::Fulfilled(v) => self.resolve_locked(interp, v),
            Settled::Rejected(r) => {
                self.settle(interp, Settled::Rejected(r));
                Ok(())
            }
        }
    }
}

impl<T: Extern> Job<T> {
    pub(crate) fn run(self, interp: &mut Interp<T>) -> Result<()> {
        match self {
            Job::React(reaction, outcome) => reaction.run(interp, outcome),
            Job::Adopt { promise, then } => {
                let (res, rej) = promise.resolving_functions("$adopt_resolve", "$adopt_reject");
                match interp.call(&then, vec![res, rej]) {
                    Ok(_) => Ok(()),
                    Err(e) if e.is_fatal() => Err(e),
                    Err(e) => {
                        let reason = interp.error_to_val(e);
                        promise.settle(interp, Settled::Rejected(reason));
                        Ok(())
                    }
                }
            }
        }
    }
}

impl<T: Extern> Reaction<T> {
    fn run(self, interp: &mut Interp<T>, outcome: Settled<T>) -> Result<()> {
        match self {
            Reaction::Then {
                on_ok,
                on_err,
                next,
            } => {
                let handler = match outcome {
                    Settled::Fulfilled(_) => on_ok,
                    Settled::Rejected(_) => on_err,
                };
                let Some(handler) = handler else {
                    next.settle(interp, outcome);
                    return Ok(());
                };
                match interp.call(&handler, vec![outcome.value().clone()]) {
                    Ok(v) => next.resolve(interp, v),
                    Err(e) if e.is_fatal() => Err(e),
                    Err(e) => {
                        let reason = interp.error_to_val(e);
                        next.reject(interp, reason);
                        Ok(())
                    }
                }
            }
            Reaction::Finally { f, next } => match interp.call(&f, vec![]) {
                Ok(_) => {
                    next.settle(interp, outcome);
                    Ok(())
                }
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => {
                    let reason = interp.error_to_val(e);
                    next.reject(interp, reason);
                    Ok(())
                }
            },
            Reaction::Host(f) => {
                f(interp, outcome);
                Ok(())
            }
        }
    }
}

/// The callable `then` of a foreign then-able, if value is one
pub fn then_of<T: Extern>(interp: &mut Interp<T>, value: &Val<T>) -> Result<Option<Val<T>>> {
    let then = match value {
        Val::Object(_) => interp.get_member(value, "then")?,
        Val::Extern(e) if e.has_method("then") => interp.get_member(value, "then")?,
        _ => return Ok(None),
    };
    if then.is_callable() {
        debug!("adopting then-able");
        Ok(Some(then))
    } else {
        Ok(None)
    }
}

impl<T: Extern> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Extern> PartialEq for Promise<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Extern> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Extern> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Promise(<{}>)", self.state_name())
    }
}

/// Coerce a value into a promise, as `Promise.resolve` does
pub fn to_promise<T: Extern>(interp: &mut Interp<T>, value: Val<T>) -> Result<Promise<T>> {
    if let Val::Promise(p) = value {
        return Ok(p);
    }
    let p = Promise::new();
    p.resolve(interp, value)?;
    Ok(p)
}

/// Error raised when settling from a value that is not a promise
pub(crate) fn not_a_promise(name: &str) -> Error {
    Error::Type(format!("Method Promise.prototype.{name} called on incompatible receiver"))
}
