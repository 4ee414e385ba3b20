use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    rc::Rc,
};

use super::value::{Function, Value};

/// A scope of name bindings. Lookups fall through to the enclosing scope
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    outer: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new_global() -> Rc<Environment> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            outer: None,
        })
    }

    pub fn enclosed(outer: &Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            outer: Some(outer.clone()),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.outer.as_ref().and_then(|outer| outer.lookup(name))
    }

    /// Binds in this scope only, shadowing any outer binding of the same name
    pub fn bind(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Counts the strong references to this scope owned by functions that only this scope holds.
    /// When that equals every reference from outside the caller's handle, the scope is garbage
    pub fn internal_references(self: &Rc<Self>) -> usize {
        let bindings = self.bindings.borrow();
        let mut closures: Vec<&Rc<Function>> = Vec::new();
        for value in bindings.values() {
            if let Value::Function(function) = value {
                if Rc::ptr_eq(&function.closure, self)
                    && !closures.iter().any(|seen| Rc::ptr_eq(*seen, function))
                {
                    closures.push(function);
                }
            }
        }
        closures
            .into_iter()
            .filter(|&function| {
                let held_here = bindings
                    .values()
                    .filter(|value| matches!(value, Value::Function(f) if Rc::ptr_eq(f, function)))
                    .count();
                Rc::strong_count(function) == held_here
            })
            .count()
    }

    /// Drops every binding in this scope. Used to break closure cycles on shutdown
    pub fn clear(&self) {
        // Take the map out first so dropping values never runs under a borrow
        let bindings = self.bindings.take();
        drop(bindings);
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.borrow();
        let mut names: Vec<_> = bindings.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("outer", &self.outer.is_some())
            .finish()
    }
}
