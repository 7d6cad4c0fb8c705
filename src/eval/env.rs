use std::collections::HashMap;

use crate::ast::value::Value;

/// Constants bound so far in one evaluation pass.
///
/// Values are stored fully evaluated, so a lookup never re-enters the
/// evaluator. A name becomes visible only once its declaring statement
/// has finished evaluating. Each binding remembers its nesting depth so a
/// reference can be depth-checked without walking the value again.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    bindings: HashMap<String, Binding>,
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    depth: usize,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any earlier binding. Returns the replaced value.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let depth = value.depth();
        self.bind_with_depth(name, value, depth)
    }

    /// Bind a value whose depth the evaluator has already measured.
    pub(crate) fn bind_with_depth(
        &mut self,
        name: impl Into<String>,
        value: Value,
        depth: usize,
    ) -> Option<Value> {
        self.bindings
            .insert(name.into(), Binding { value, depth })
            .map(|old| old.value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name).map(|b| &b.value)
    }

    pub(crate) fn binding(&self, name: &str) -> Option<(&Value, usize)> {
        self.bindings.get(name).map(|b| (&b.value, b.depth))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
