// ABOUTME: Lexical scope frames: a chain of Rc-linked environments that
// ABOUTME: closures capture by reference, giving them access to outer locals.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a new child frame, e.g. for a block, loop iteration, or call.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Binds `name` in THIS frame, shadowing any outer binding of the same
    /// name. Used by `let`, function parameters, and loop variables.
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Looks up `name` in this frame, then walks the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// `name = value`: mutates the nearest existing binding in the frame
    /// chain, or creates one in the current frame if `name` is unbound
    /// anywhere. Unlike `define`, this never shadows an outer binding that
    /// already exists.
    pub fn assign(&self, name: &str, value: Value) {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return;
        }
        if let Some(ref parent) = self.parent {
            if parent.try_assign(name, &value) {
                return;
            }
        }
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Names bound directly in this frame (not the parent chain), for REPL
    /// introspection (`.vars`).
    pub fn local_names(&self) -> Vec<String> {
        self.bindings.borrow().keys().cloned().collect()
    }

    fn try_assign(&self, name: &str, value: &Value) -> bool {
        if self.bindings.borrow().contains_key(name) {
            self.bindings
                .borrow_mut()
                .insert(name.to_string(), value.clone());
            return true;
        }
        self.parent
            .as_ref()
            .map(|p| p.try_assign(name, value))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get() {
        let env = Environment::new();
        env.define("x".to_string(), Value::Long(42));
        match env.get("x") {
            Some(Value::Long(n)) => assert_eq!(n, 42),
            _ => panic!("expected Long(42)"),
        }
    }

    #[test]
    fn undefined_name_is_none() {
        let env = Environment::new();
        assert!(env.get("missing").is_none());
    }

    #[test]
    fn shadowing_in_child_frame() {
        let parent = Environment::new();
        parent.define("x".to_string(), Value::Long(1));
        let child = Environment::with_parent(parent);
        child.define("x".to_string(), Value::Long(2));
        match child.get("x") {
            Some(Value::Long(n)) => assert_eq!(n, 2),
            _ => panic!("expected Long(2)"),
        }
    }

    #[test]
    fn parent_lookup_through_chain() {
        let grandparent = Environment::new();
        grandparent.define("a".to_string(), Value::Long(1));
        let parent = Environment::with_parent(grandparent);
        parent.define("b".to_string(), Value::Long(2));
        let child = Environment::with_parent(parent);
        child.define("c".to_string(), Value::Long(3));

        assert!(matches!(child.get("a"), Some(Value::Long(1))));
        assert!(matches!(child.get("b"), Some(Value::Long(2))));
        assert!(matches!(child.get("c"), Some(Value::Long(3))));
    }

    #[test]
    fn assign_mutates_nearest_existing_binding() {
        let parent = Environment::new();
        parent.define("x".to_string(), Value::Long(1));
        let child = Environment::with_parent(parent.clone());

        child.assign("x", Value::Long(99));

        assert!(matches!(child.get("x"), Some(Value::Long(99))));
        assert!(matches!(parent.get("x"), Some(Value::Long(99))));
        assert!(child.bindings.borrow().get("x").is_none());
    }

    #[test]
    fn assign_to_unbound_name_creates_in_current_frame() {
        let parent = Environment::new();
        let child = Environment::with_parent(parent.clone());

        child.assign("y", Value::Long(5));

        assert!(matches!(child.get("y"), Some(Value::Long(5))));
        assert!(parent.get("y").is_none());
    }
}
