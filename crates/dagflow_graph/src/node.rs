//! Graph nodes.
//!
//! A [`Node`] wraps an [`Operation`] with identity and metadata: a stable ID,
//! a display name, a category, an optional registry URI, a breakpoint flag,
//! its ports, and an extension bag. Port removal goes through the owning
//! [`Graph`](crate::graph::Graph) so that links are kept consistent.

use core::fmt;

use dagflow_system::extension::Extensions;
use dagflow_system::field::{Direction, Field, FieldError, Ports};
use dagflow_system::id::NodeId;
use dagflow_system::operation::{BoxedOperation, Operation};
use dagflow_system::registry::NodeRegistry;

use crate::graph::GraphError;
use crate::macro_node::MacroNode;

/// A vertex of a [`Graph`](crate::graph::Graph).
pub struct Node {
    id: NodeId,
    name: String,
    category: String,
    type_uri: Option<String>,
    breakpoint: bool,
    ports: Ports,
    extensions: Extensions,
    operation: BoxedOperation,
}

impl Node {
    /// Creates a node from an operation, with a fresh ID and the ports the
    /// operation declares.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if the operation declares conflicting ports.
    pub fn new(operation: impl Operation) -> Result<Self, FieldError> {
        Self::from_boxed(Box::new(operation))
    }

    /// Creates a node from a boxed operation.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if the operation declares conflicting ports.
    pub fn from_boxed(operation: BoxedOperation) -> Result<Self, FieldError> {
        let mut ports = Ports::new();
        operation.declare(&mut ports)?;
        Ok(Self {
            id: NodeId::new(),
            name: operation.name().to_owned(),
            category: operation.category().to_owned(),
            type_uri: None,
            breakpoint: false,
            ports,
            extensions: Extensions::new(),
            operation,
        })
    }

    /// Instantiates a registered node type.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Registry`] for an unknown URI and
    /// [`GraphError::Declaration`] if the operation declares conflicting ports.
    pub fn from_registry(registry: &NodeRegistry, uri: &str) -> Result<Self, GraphError> {
        let operation = registry.create(uri)?;
        let mut node = Self::from_boxed(operation).map_err(|source| GraphError::Declaration {
            operation: uri.to_owned(),
            source,
        })?;
        node.type_uri = Some(uri.to_owned());
        Ok(node)
    }

    /// Replaces the generated ID.
    #[must_use]
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Replaces the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Records the registry URI this node was built from.
    #[must_use]
    pub fn with_type_uri(mut self, uri: impl Into<String>) -> Self {
        self.type_uri = Some(uri.into());
        self
    }

    /// Sets the breakpoint flag.
    #[must_use]
    pub fn with_breakpoint(mut self, breakpoint: bool) -> Self {
        self.breakpoint = breakpoint;
        self
    }

    /// Returns the node's ID.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the node.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the category.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the registry URI, if the node came from a registry.
    #[must_use]
    pub fn type_uri(&self) -> Option<&str> {
        self.type_uri.as_deref()
    }

    /// Returns `true` if the processor halts after running this node.
    #[must_use]
    pub fn has_breakpoint(&self) -> bool {
        self.breakpoint
    }

    /// Sets or clears the breakpoint flag.
    pub fn set_breakpoint(&mut self, breakpoint: bool) {
        self.breakpoint = breakpoint;
    }

    /// Returns the node's ports.
    #[must_use]
    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    /// Returns the input ports in order.
    #[must_use]
    pub fn inputs(&self) -> &[Field] {
        self.ports.inputs()
    }

    /// Returns the output ports in order.
    #[must_use]
    pub fn outputs(&self) -> &[Field] {
        self.ports.outputs()
    }

    /// Looks up an input port.
    #[must_use]
    pub fn input(&self, key: &str) -> Option<&Field> {
        self.ports.get(Direction::Input, key)
    }

    /// Looks up an output port.
    #[must_use]
    pub fn output(&self, key: &str) -> Option<&Field> {
        self.ports.get(Direction::Output, key)
    }

    /// Looks up a port on either side.
    #[must_use]
    pub fn field(&self, direction: Direction, key: &str) -> Option<&Field> {
        self.ports.get(direction, key)
    }

    /// Adds a port.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::DuplicateKey`] if the key is taken on that side.
    pub fn add_field(&mut self, field: Field) -> Result<(), FieldError> {
        self.ports.add(field).map(|_| ())
    }

    pub(crate) fn remove_field(
        &mut self,
        direction: Direction,
        key: &str,
    ) -> Result<Field, FieldError> {
        self.ports.remove(direction, key)
    }

    /// Returns the node's extension bag.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns the node's extension bag mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Returns the operation behind this node.
    #[must_use]
    pub fn operation(&self) -> &dyn Operation {
        self.operation.as_ref()
    }

    /// Downcasts the operation to a concrete type.
    #[must_use]
    pub fn operation_as<T: Operation>(&self) -> Option<&T> {
        self.operation.downcast_ref::<T>()
    }

    /// Downcasts the operation to a concrete type, mutably.
    pub fn operation_as_mut<T: Operation>(&mut self) -> Option<&mut T> {
        self.operation.downcast_mut::<T>()
    }

    /// Returns the macro behind this node, if it is one.
    #[must_use]
    pub fn as_macro(&self) -> Option<&MacroNode> {
        self.operation_as::<MacroNode>()
    }

    /// Returns `true` if this node owns a sub-graph.
    #[must_use]
    pub fn is_macro(&self) -> bool {
        self.operation.is::<MacroNode>()
    }

    pub(crate) fn macro_parts_mut(&mut self) -> Option<(&mut Ports, &mut MacroNode)> {
        let Self {
            ports, operation, ..
        } = self;
        operation
            .downcast_mut::<MacroNode>()
            .map(|macro_node| (ports, macro_node))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("type_uri", &self.type_uri)
            .field("breakpoint", &self.breakpoint)
            .field("ports", &self.ports)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}
