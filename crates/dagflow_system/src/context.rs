//! Hierarchical execution contexts.
//!
//! A [`Context`] stores port values for one scope and owns one child context
//! per node executed in that scope. The processor runs a graph against a root
//! context; each node writes into its own child, and a macro node's child in
//! turn holds the children of its inner nodes.
//!
//! ```text
//! root
//! ├── node_a      { output:value = 2 }
//! ├── node_b      { output:value = 3 }
//! └── node_macro  { input:x = [1, 2], output:y = [..] }
//!     └── node_inner { input:x = 1, output:y = .. }
//! ```
//!
//! Values are opaque here. Type checks happen when links are created and
//! before an operation runs, never on `put`.

use core::fmt;

use hashbrown::HashMap;

use crate::field::{Direction, Field, FieldKey};
use crate::id::NodeId;
use crate::value::Value;

/// Addresses one port value inside a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    direction: Direction,
    key: FieldKey,
}

impl Slot {
    /// Creates a slot.
    #[must_use]
    pub fn new(direction: Direction, key: impl Into<FieldKey>) -> Self {
        Self {
            direction,
            key: key.into(),
        }
    }

    /// Slot for an input port.
    #[must_use]
    pub fn input(key: impl Into<FieldKey>) -> Self {
        Self::new(Direction::Input, key)
    }

    /// Slot for an output port.
    #[must_use]
    pub fn output(key: impl Into<FieldKey>) -> Self {
        Self::new(Direction::Output, key)
    }

    /// Returns the side of the port.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the port key.
    #[must_use]
    pub fn key(&self) -> &FieldKey {
        &self.key
    }
}

impl From<&Field> for Slot {
    fn from(field: &Field) -> Self {
        Self::new(field.direction(), field.key().clone())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.direction, self.key)
    }
}

/// A scoped value store with per-node children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: HashMap<Slot, Value>,
    children: HashMap<NodeId, Context>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, returning the previous one.
    pub fn put(&mut self, slot: Slot, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(slot, value.into())
    }

    /// Reads a value from this scope only. Children and parents are not consulted.
    #[must_use]
    pub fn get(&self, slot: &Slot) -> Option<&Value> {
        self.values.get(slot)
    }

    /// Shorthand for `get(&Slot::input(key))`.
    #[must_use]
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.get(&Slot::input(key))
    }

    /// Shorthand for `get(&Slot::output(key))`.
    #[must_use]
    pub fn output(&self, key: &str) -> Option<&Value> {
        self.get(&Slot::output(key))
    }

    /// Returns `true` if this scope holds a value for the slot.
    #[must_use]
    pub fn contains_key(&self, slot: &Slot) -> bool {
        self.values.contains_key(slot)
    }

    /// Removes a value from this scope.
    pub fn remove(&mut self, slot: &Slot) -> Option<Value> {
        self.values.remove(slot)
    }

    /// Removes every value and every child context.
    pub fn clear(&mut self) {
        self.values.clear();
        self.children.clear();
    }

    /// Removes every child context, keeping this scope's own values.
    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Returns the child context for `node`, creating it if absent.
    pub fn get_child_context(&mut self, node: &NodeId) -> &mut Context {
        self.children.entry(node.clone()).or_default()
    }

    /// Returns the child context for `node` if it exists.
    #[must_use]
    pub fn find_child_context(&self, node: &NodeId) -> Option<&Context> {
        self.children.get(node)
    }

    /// Mutable variant of [`find_child_context`](Self::find_child_context).
    pub fn find_child_context_mut(&mut self, node: &NodeId) -> Option<&mut Context> {
        self.children.get_mut(node)
    }

    /// Detaches and returns the child context for `node`.
    pub fn remove_child_context(&mut self, node: &NodeId) -> Option<Context> {
        self.children.remove(node)
    }

    /// Follows `path` through child contexts, creating any that are missing.
    pub fn descend_mut(&mut self, path: &[NodeId]) -> &mut Context {
        let mut ctx = self;
        for node in path {
            ctx = ctx.get_child_context(node);
        }
        ctx
    }

    /// Follows `path` through existing child contexts.
    #[must_use]
    pub fn find_descendant(&self, path: &[NodeId]) -> Option<&Context> {
        let mut ctx = self;
        for node in path {
            ctx = ctx.find_child_context(node)?;
        }
        Some(ctx)
    }

    /// Returns the number of values in this scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if this scope holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of child contexts.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Iterates over the values in this scope, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = (&Slot, &Value)> {
        self.values.iter()
    }

    /// Iterates over child contexts, in no particular order.
    pub fn children(&self) -> impl Iterator<Item = (&NodeId, &Context)> {
        self.children.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_contains() {
        let mut ctx = Context::new();
        assert!(ctx.put(Slot::output("x"), 4_i64).is_none());
        assert_eq!(ctx.output("x"), Some(&Value::Int(4)));
        assert!(ctx.contains_key(&Slot::output("x")));
        assert!(!ctx.contains_key(&Slot::input("x")));
        assert_eq!(ctx.put(Slot::output("x"), 5_i64), Some(Value::Int(4)));
    }

    #[test]
    fn input_and_output_slots_do_not_collide() {
        let mut ctx = Context::new();
        ctx.put(Slot::input("v"), 1_i64);
        ctx.put(Slot::output("v"), 2_i64);
        assert_eq!(ctx.input("v"), Some(&Value::Int(1)));
        assert_eq!(ctx.output("v"), Some(&Value::Int(2)));
    }

    #[test]
    fn child_values_are_isolated() {
        let a = NodeId::from_string("a");
        let b = NodeId::from_string("b");
        let mut root = Context::new();
        root.get_child_context(&a).put(Slot::output("v"), 1_i64);

        assert!(root.get(&Slot::output("v")).is_none());
        assert!(root.find_child_context(&b).is_none());
        assert!(root.get_child_context(&b).get(&Slot::output("v")).is_none());
        assert_eq!(
            root.find_child_context(&a).and_then(|c| c.output("v")),
            Some(&Value::Int(1))
        );
    }

    #[test]
    fn find_child_context_does_not_create() {
        let a = NodeId::from_string("a");
        let root = Context::new();
        assert!(root.find_child_context(&a).is_none());
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn descend_creates_path() {
        let outer = NodeId::from_string("outer");
        let inner = NodeId::from_string("inner");
        let mut root = Context::new();
        root.descend_mut(&[outer.clone(), inner.clone()])
            .put(Slot::output("y"), "deep");

        let found = root.find_descendant(&[outer.clone(), inner]).unwrap();
        assert_eq!(found.output("y"), Some(&Value::from("deep")));
        assert!(root.find_descendant(&[NodeId::from_string("other")]).is_none());
        assert_eq!(root.find_descendant(&[]).map(Context::len), Some(0));
        assert_eq!(root.find_child_context(&outer).map(Context::len), Some(0));
    }

    #[test]
    fn clear_drops_values_and_children() {
        let a = NodeId::from_string("a");
        let mut root = Context::new();
        root.put(Slot::input("top"), true);
        root.get_child_context(&a).put(Slot::output("v"), 1_i64);

        root.clear_children();
        assert_eq!(root.child_count(), 0);
        assert_eq!(root.len(), 1);

        root.get_child_context(&a);
        root.clear();
        assert!(root.is_empty());
        assert_eq!(root.child_count(), 0);
    }
}
