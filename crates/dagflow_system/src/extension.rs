//! Typed side tables attached to nodes and graphs.
//!
//! Editors, serializers, and plugins attach arbitrary data to a node or graph
//! without the engine knowing its shape. Each capability is keyed by its Rust
//! type, so there is at most one value per type per owner.
//!
//! ```
//! use dagflow_system::extension::Extensions;
//!
//! struct CanvasPosition { x: f32, y: f32 }
//!
//! let mut extensions = Extensions::new();
//! extensions.insert(CanvasPosition { x: 10.0, y: 4.0 });
//!
//! assert_eq!(extensions.get::<CanvasPosition>().map(|p| p.x), Some(10.0));
//! ```

use core::any::{Any, TypeId};
use core::fmt;

use hashbrown::HashMap;

/// A value that can be attached to a node or graph.
///
/// Any type that is `Send + Sync + 'static` automatically implements `Extension`.
pub trait Extension: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Extension for T {}

/// Identifies an extension by its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ExtensionId {
    /// Creates the ID for extension type `T`.
    #[must_use]
    pub fn of<T: Extension>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging and reflection.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// A typed map holding at most one value per type.
#[derive(Default)]
pub struct Extensions {
    storage: HashMap<TypeId, (ExtensionId, Box<dyn Any + Send + Sync>)>,
}

impl Extensions {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value of the same type.
    pub fn insert<T: Extension>(&mut self, value: T) -> Option<T> {
        let id = ExtensionId::of::<T>();
        self.storage
            .insert(id.type_id, (id, Box::new(value)))
            .and_then(|(_, old)| old.downcast::<T>().ok().map(|boxed| *boxed))
    }

    /// Returns `true` if a value of type `T` is present.
    #[must_use]
    pub fn contains<T: Extension>(&self) -> bool {
        self.storage.contains_key(&TypeId::of::<T>())
    }

    /// Returns the value of type `T`.
    #[must_use]
    pub fn get<T: Extension>(&self) -> Option<&T> {
        self.storage
            .get(&TypeId::of::<T>())
            .and_then(|(_, value)| value.downcast_ref::<T>())
    }

    /// Returns the value of type `T` mutably.
    pub fn get_mut<T: Extension>(&mut self) -> Option<&mut T> {
        self.storage
            .get_mut(&TypeId::of::<T>())
            .and_then(|(_, value)| value.downcast_mut::<T>())
    }

    /// Returns the value of type `T`, inserting one built by `init` if absent.
    pub fn get_or_insert_with<T: Extension>(&mut self, init: impl FnOnce() -> T) -> &mut T {
        let id = ExtensionId::of::<T>();
        let (_, value) = self
            .storage
            .entry(id.type_id)
            .or_insert_with(|| (id, Box::new(init())));
        value
            .downcast_mut::<T>()
            .unwrap_or_else(|| unreachable!("extension stored under the wrong TypeId"))
    }

    /// Removes and returns the value of type `T`.
    pub fn remove<T: Extension>(&mut self) -> Option<T> {
        self.storage
            .remove(&TypeId::of::<T>())
            .and_then(|(_, value)| value.downcast::<T>().ok().map(|boxed| *boxed))
    }

    /// Returns the IDs of every stored extension, sorted by type name.
    #[must_use]
    pub fn ids(&self) -> Vec<ExtensionId> {
        let mut ids: Vec<_> = self.storage.values().map(|(id, _)| *id).collect();
        ids.sort_by_key(|id| id.type_name);
        ids
    }

    /// Returns the number of stored extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.storage.clear();
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.ids().iter().map(ExtensionId::type_name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position(i32, i32);

    #[derive(Debug, PartialEq)]
    struct Comment(&'static str);

    #[test]
    fn insert_replaces_same_type() {
        let mut ext = Extensions::new();
        assert!(ext.insert(Position(1, 2)).is_none());
        assert_eq!(ext.insert(Position(3, 4)), Some(Position(1, 2)));
        assert_eq!(ext.get::<Position>(), Some(&Position(3, 4)));
        assert_eq!(ext.len(), 1);
    }

    #[test]
    fn types_are_independent() {
        let mut ext = Extensions::new();
        ext.insert(Position(0, 0));
        ext.insert(Comment("note"));
        assert_eq!(ext.len(), 2);
        assert_eq!(ext.remove::<Comment>(), Some(Comment("note")));
        assert!(!ext.contains::<Comment>());
        assert!(ext.contains::<Position>());
    }

    #[test]
    fn get_mut_and_get_or_insert() {
        let mut ext = Extensions::new();
        ext.get_or_insert_with(|| Position(0, 0)).0 = 7;
        assert_eq!(ext.get::<Position>(), Some(&Position(7, 0)));
        if let Some(pos) = ext.get_mut::<Position>() {
            pos.1 = 9;
        }
        assert_eq!(ext.get::<Position>(), Some(&Position(7, 9)));
        assert_eq!(ext.get_or_insert_with(|| Position(1, 1)), &mut Position(7, 9));
    }

    #[test]
    fn ids_report_type_names() {
        let mut ext = Extensions::new();
        ext.insert(Comment("x"));
        let ids = ext.ids();
        assert_eq!(ids.len(), 1);
        assert!(ids[0].type_name().ends_with("Comment"));
        assert_eq!(ids[0], ExtensionId::of::<Comment>());
    }
}
