//! Registry of node types.
//!
//! Hosts discover node types however they like (plugins, static tables) and
//! register each one under a URI with a no-argument factory. Editors list the
//! entries by category; deserializers instantiate nodes by URI.

use core::fmt;

use hashbrown::HashMap;

use crate::operation::{BoxedOperation, Operation};

/// Errors raised by [`NodeRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The URI is already registered.
    #[error("node type already registered: {0}")]
    DuplicateRegistration(String),

    /// No factory is registered under the URI.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),
}

type Factory = Box<dyn Fn() -> BoxedOperation + Send + Sync>;

/// One registered node type.
pub struct RegistryEntry {
    uri: String,
    name: String,
    category: String,
    factory: Factory,
}

impl RegistryEntry {
    /// Returns the URI the type is registered under.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the display name of the type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the category of the type.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Builds a fresh operation.
    #[must_use]
    pub fn instantiate(&self) -> BoxedOperation {
        (self.factory)()
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Maps node type URIs to factories.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a default-constructible operation type.
    ///
    /// Name and category are read from a freshly built instance.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if `uri` is taken.
    pub fn register<T: Operation + Default>(
        &mut self,
        uri: impl Into<String>,
    ) -> Result<&mut Self, RegistryError> {
        self.register_factory(uri, || Box::new(T::default()))
    }

    /// Registers an arbitrary factory.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if `uri` is taken.
    pub fn register_factory(
        &mut self,
        uri: impl Into<String>,
        factory: impl Fn() -> BoxedOperation + Send + Sync + 'static,
    ) -> Result<&mut Self, RegistryError> {
        let uri = uri.into();
        if self.entries.contains_key(&uri) {
            return Err(RegistryError::DuplicateRegistration(uri));
        }
        let sample = factory();
        let entry = RegistryEntry {
            uri: uri.clone(),
            name: sample.name().to_owned(),
            category: sample.category().to_owned(),
            factory: Box::new(factory),
        };
        self.entries.insert(uri, entry);
        Ok(self)
    }

    /// Builds a fresh operation of the registered type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownNodeType`] if nothing is registered under `uri`.
    pub fn create(&self, uri: &str) -> Result<BoxedOperation, RegistryError> {
        self.entries
            .get(uri)
            .map(RegistryEntry::instantiate)
            .ok_or_else(|| RegistryError::UnknownNodeType(uri.to_owned()))
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&RegistryEntry> {
        self.entries.get(uri)
    }

    /// Returns `true` if `uri` is registered.
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    /// Returns every entry, sorted by URI.
    #[must_use]
    pub fn entries(&self) -> Vec<&RegistryEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.uri.cmp(&b.uri));
        entries
    }

    /// Returns the entries in one category, sorted by URI.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<&RegistryEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.category == category)
            .collect()
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use crate::operation::OperateContext;

    #[derive(Default)]
    struct Noop;

    impl Operation for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn operate(&self, _ctx: &mut OperateContext<'_>) -> Result<(), NodeError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Source;

    impl Operation for Source {
        fn name(&self) -> &str {
            "source"
        }

        fn category(&self) -> &str {
            "inputs"
        }

        fn operate(&self, _ctx: &mut OperateContext<'_>) -> Result<(), NodeError> {
            Ok(())
        }
    }

    #[test]
    fn register_and_create() {
        let mut registry = NodeRegistry::new();
        registry.register::<Noop>("core/noop").unwrap();

        let op = registry.create("core/noop").unwrap();
        assert_eq!(op.name(), "noop");
        assert!(op.is::<Noop>());

        let entry = registry.get("core/noop").unwrap();
        assert_eq!(entry.name(), "noop");
        assert_eq!(entry.category(), "general");
    }

    #[test]
    fn duplicate_uri_rejected() {
        let mut registry = NodeRegistry::new();
        registry.register::<Noop>("core/noop").unwrap();
        let err = registry.register::<Source>("core/noop").unwrap_err();
        assert_eq!(err, RegistryError::DuplicateRegistration("core/noop".into()));
        assert!(registry.create("core/noop").unwrap().is::<Noop>());
    }

    #[test]
    fn unknown_uri() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.create("missing"),
            Err(RegistryError::UnknownNodeType(uri)) if uri == "missing"
        ));
    }

    #[test]
    fn entries_sorted_and_grouped() {
        let mut registry = NodeRegistry::new();
        registry
            .register::<Source>("io/source")
            .unwrap()
            .register::<Noop>("core/noop")
            .unwrap();

        let uris: Vec<_> = registry.entries().iter().map(|e| e.uri()).collect();
        assert_eq!(uris, ["core/noop", "io/source"]);
        assert_eq!(registry.by_category("inputs").len(), 1);
        assert_eq!(registry.len(), 2);
    }
}
