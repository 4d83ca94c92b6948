use crate::{Error, Extern, Result, Val};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// A lexical scope of bindings
#[derive(Debug)]
pub struct Env<T: Extern> {
    bindings: HashMap<String, Binding<T>>,
    parent: Option<EnvRef<T>>,
}

/// Reference to an environment
pub type EnvRef<T> = Arc<Mutex<Env<T>>>;

#[derive(Debug)]
struct Binding<T: Extern> {
    val: Val<T>,
    mutable: bool,
}

impl<T: Extern> Env<T> {
    /// Create an empty root scope
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    /// Extend an existing environment with given env as parent
    pub fn extend(parent: &EnvRef<T>) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: Some(Arc::clone(parent)),
        }
    }

    /// Wrap in a shareable reference
    pub fn into_ref(self) -> EnvRef<T> {
        Arc::new(Mutex::new(self))
    }

    /// Define or redefine a mutable binding in current scope
    pub fn define(&mut self, name: &str, val: Val<T>) -> &mut Self {
        self.bindings.insert(
            name.to_string(),
            Binding { val, mutable: true },
        );
        self
    }

    /// Declare a new binding in current scope, failing if one already exists
    pub fn declare(&mut self, name: &str, val: Val<T>, mutable: bool) -> Result<()> {
        if self.bindings.contains_key(name) {
            return Err(Error::Redeclared(name.to_string()));
        }
        self.bindings
            .insert(name.to_string(), Binding { val, mutable });
        Ok(())
    }

    /// Get value bound to name in this scope or any enclosing scope
    pub fn get(&self, name: &str) -> Option<Val<T>> {
        match self.bindings.get(name) {
            Some(b) => Some(b.val.clone()),
            None => self
                .parent
                .as_ref()
                .and_then(|p| p.lock().unwrap().get(name)),
        }
    }

    /// Set value of an existing binding in lexical scope
    pub fn set(&mut self, name: &str, val: Val<T>) -> Result<()> {
        if let Some(b) = self.bindings.get_mut(name) {
            if !b.mutable {
                return Err(Error::ConstAssign(name.to_string()));
            }
            b.val = val;
            return Ok(());
        }

        match self.parent {
            Some(ref p) => p.lock().unwrap().set(name, val),
            None => Err(Error::Undefined(name.to_string())),
        }
    }

    /// Whether or not name is bound in this scope, ignoring parents
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

impl<T: Extern> Default for Env<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void::Void;

    type Val = super::Val<Void>;
    type Env = super::Env<Void>;

    #[test]
    fn get() {
        let mut env = Env::new();
        env.define("x", Val::Num(0.0));
        assert_eq!(env.get("x"), Some(Val::Num(0.0)));
        assert_eq!(env.get("y"), None);
    }

    #[test]
    fn get_from_parent() {
        let parent = Env::new().into_ref();
        parent.lock().unwrap().define("x", Val::Num(1.0));
        let child = Env::extend(&parent);
        assert_eq!(child.get("x"), Some(Val::Num(1.0)));
        assert!(!child.contains("x"));
    }

    #[test]
    fn declare_twice() {
        let mut env = Env::new();
        assert_eq!(env.declare("x", Val::Null, true), Ok(()));
        assert_eq!(
            env.declare("x", Val::Null, true),
            Err(Error::Redeclared("x".to_string()))
        );
    }

    #[test]
    fn shadow_in_child() {
        let parent = Env::new().into_ref();
        parent
            .lock()
            .unwrap()
            .declare("width", Val::Num(888.0), false)
            .unwrap();
        let mut child = Env::extend(&parent);
        assert_eq!(child.declare("width", Val::Num(10.0), false), Ok(()));
        assert_eq!(child.get("width"), Some(Val::Num(10.0)));
        assert_eq!(parent.lock().unwrap().get("width"), Some(Val::Num(888.0)));
    }

    #[test]
    fn set_through_parent() {
        let parent = Env::new().into_ref();
        parent.lock().unwrap().define("x", Val::Num(0.0));
        let mut child = Env::extend(&parent);
        assert_eq!(child.set("x", Val::string("one")), Ok(()));
        assert_eq!(parent.lock().unwrap().get("x"), Some(Val::string("one")));
    }

    #[test]
    fn set_const() {
        let mut env = Env::new();
        env.declare("x", Val::Num(0.0), false).unwrap();
        assert_eq!(
            env.set("x", Val::Num(1.0)),
            Err(Error::ConstAssign("x".to_string()))
        );
    }

    #[test]
    fn set_undefined() {
        let mut env = Env::new();
        assert_eq!(
            env.set("x", Val::Num(1.0)),
            Err(Error::Undefined("x".to_string()))
        );
    }
}
