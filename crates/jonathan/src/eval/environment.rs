//! Lexical environments for the evaluator.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::value::Value;

/// A name→value map with a pointer to the enclosing environment.
///
/// Environments are shared (`Rc<RefCell<…>>`) because function values keep
/// their defining environment alive, and a recursive binding makes the
/// structure cyclic.
#[derive(Debug, Default)]
pub struct Environment {
    store: AHashMap<String, Value>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// A fresh top-level environment.
    #[must_use]
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    /// A new scope chained to `outer`; lookups fall through to it.
    #[must_use]
    pub fn enclosed(outer: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            store: AHashMap::new(),
            outer: Some(outer),
        }))
    }

    /// Looks `name` up through the environment chain.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.store.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .outer
                .as_ref()
                .and_then(|outer| outer.borrow().get(name)),
        }
    }

    /// Binds `name` in this environment, shadowing any outer binding.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.store.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outward() {
        let outer = Environment::new();
        outer.borrow_mut().set("a", Value::Integer(1));
        let inner = Environment::enclosed(Rc::clone(&outer));
        inner.borrow_mut().set("b", Value::Integer(2));

        assert_eq!(inner.borrow().get("a"), Some(Value::Integer(1)));
        assert_eq!(inner.borrow().get("b"), Some(Value::Integer(2)));
        assert_eq!(outer.borrow().get("b"), None);
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let outer = Environment::new();
        outer.borrow_mut().set("a", Value::Integer(1));
        let inner = Environment::enclosed(Rc::clone(&outer));
        inner.borrow_mut().set("a", Value::Integer(2));

        assert_eq!(inner.borrow().get("a"), Some(Value::Integer(2)));
        assert_eq!(outer.borrow().get("a"), Some(Value::Integer(1)));
    }
}
