//! The dataflow graph.
//!
//! A [`Graph`] owns [`Node`]s and the [`Link`]s between their ports. Every
//! mutation checks its preconditions first and either applies completely or
//! returns a [`GraphError`] with the graph untouched. The node/link set is a
//! DAG at all times; its topological order is cached by the underlying
//! [`Dag`] and recomputed after structural changes.

use core::fmt;

use dagflow_system::error::ItemMissingError;
use dagflow_system::extension::Extensions;
use dagflow_system::field::{Direction, Field, FieldError, FieldKey};
use dagflow_system::id::NodeId;
use dagflow_system::operation::Operation;
use dagflow_system::registry::RegistryError;
use dagflow_system::value::ValueType;
use hashbrown::HashMap;

use crate::dag::{Dag, DagError, InvalidEdge};
use crate::link::Link;
use crate::macro_node::MacroNode;
use crate::node::Node;

/// A set of nodes connected by links, always acyclic.
#[derive(Debug, Default)]
pub struct Graph {
    dag: Dag<NodeId, Link>,
    nodes: HashMap<NodeId, Node>,
    extensions: Extensions,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Nodes
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a node and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] if a node with the same ID exists.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = node.id().clone();
        self.dag.add_vertex(id.clone()).map_err(GraphError::from)?;
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    /// Wraps an operation in a new node and adds it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Declaration`] if the operation declares conflicting ports.
    pub fn add_operation(&mut self, operation: impl Operation) -> Result<NodeId, GraphError> {
        let name = operation.name().to_owned();
        let node = Node::new(operation).map_err(|source| GraphError::Declaration {
            operation: name,
            source,
        })?;
        self.add_node(node)
    }

    /// Removes a node and every link attached to it.
    ///
    /// Returns the node and the removed links, in link insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(Node, Vec<Link>), GraphError> {
        let links = self.dag.remove_vertex(id).map_err(GraphError::from)?;
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        Ok((node, links))
    }

    /// Looks up a node.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Looks up a node mutably.
    ///
    /// Ports can be added through the returned node; removing them goes
    /// through [`remove_field`](Self::remove_field) so links stay consistent.
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Returns `true` if the node exists.
    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterates over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.dag.vertices().filter_map(|id| self.nodes.get(id))
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sets or clears a node's breakpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn set_breakpoint(&mut self, id: &NodeId, breakpoint: bool) -> Result<(), GraphError> {
        self.node_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?
            .set_breakpoint(breakpoint);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fields
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a port to a node.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NodeNotFound`] if the node does not exist
    /// - [`GraphError::Field`] wrapping [`FieldError::DuplicateKey`] if the key is taken
    pub fn add_field(&mut self, id: &NodeId, field: Field) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        node.add_field(field).map_err(|source| GraphError::Field {
            node: id.clone(),
            source,
        })
    }

    /// Removes a port from a node, first removing every link attached to it.
    ///
    /// Removing a published port of a macro node also drops its mapping.
    /// Returns the port and the removed links.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NodeNotFound`] if the node does not exist
    /// - [`GraphError::Field`] wrapping [`FieldError::NotFound`] for an unknown key
    /// - [`GraphError::Field`] wrapping [`FieldError::IllegalOperation`] for a fixed port
    pub fn remove_field(
        &mut self,
        id: &NodeId,
        direction: Direction,
        key: &str,
    ) -> Result<(Field, Vec<Link>), GraphError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        let field_error = |source| GraphError::Field {
            node: id.clone(),
            source,
        };
        let field = node.field(direction, key).ok_or_else(|| {
            field_error(FieldError::NotFound {
                direction,
                key: FieldKey::new(key),
            })
        })?;
        if field.is_fixed() {
            return Err(field_error(FieldError::IllegalOperation(format!(
                "{direction} field '{key}' is fixed and cannot be removed"
            ))));
        }

        let links = self
            .dag
            .remove_edges_where(|link| link.touches(id, direction, key));
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        let field = node.remove_field(direction, key).map_err(field_error)?;
        if let Some((_, macro_node)) = node.macro_parts_mut() {
            macro_node.forget(direction, key);
        }
        Ok((field, links))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Links
    // ─────────────────────────────────────────────────────────────────────────

    /// Links `source.source_field` (an output) to `target.target_field` (an input).
    ///
    /// # Errors
    ///
    /// - [`GraphError::NodeNotFound`] if either node is missing
    /// - [`GraphError::Field`] if either port is missing
    /// - [`GraphError::InvalidLink`] for a self-loop or a duplicate link
    /// - [`GraphError::CycleDetected`] if the link would close a cycle
    /// - [`GraphError::IncompatibleTypes`] if the input rejects the output's declared type
    /// - [`GraphError::InputAlreadyLinked`] if a single-link input is already bound
    pub fn connect(
        &mut self,
        source: &NodeId,
        source_field: &str,
        target: &NodeId,
        target_field: &str,
    ) -> Result<Link, GraphError> {
        let link = Link::new(source.clone(), source_field, target.clone(), target_field);
        self.check_link(&link)?;
        self.dag.add_edge(link.clone()).map_err(|err| Self::link_error(&link, err))?;
        Ok(link)
    }

    /// Runs every check [`connect`](Self::connect) would, without mutating.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    pub fn check_link(&self, link: &Link) -> Result<(), GraphError> {
        let source = self
            .node(link.source())
            .ok_or_else(|| GraphError::NodeNotFound(link.source().clone()))?;
        let target = self
            .node(link.target())
            .ok_or_else(|| GraphError::NodeNotFound(link.target().clone()))?;
        let output = source.output(link.source_field().as_str()).ok_or_else(|| {
            GraphError::Field {
                node: link.source().clone(),
                source: FieldError::NotFound {
                    direction: Direction::Output,
                    key: link.source_field().clone(),
                },
            }
        })?;
        let input = target.input(link.target_field().as_str()).ok_or_else(|| {
            GraphError::Field {
                node: link.target().clone(),
                source: FieldError::NotFound {
                    direction: Direction::Input,
                    key: link.target_field().clone(),
                },
            }
        })?;

        self.dag
            .check_edge(link)
            .map_err(|err| Self::link_error(link, err))?;

        if !input.accepts_type(output.value_type()) {
            return Err(GraphError::IncompatibleTypes {
                link: link.clone(),
                expected: input.expectation(),
                found: output.value_type().clone(),
            });
        }
        if !input.is_multi()
            && let Some(existing) = self
                .incoming_links(link.target())
                .into_iter()
                .find(|existing| existing.target_field() == link.target_field())
        {
            return Err(GraphError::InputAlreadyLinked {
                link: link.clone(),
                existing: existing.clone(),
            });
        }
        Ok(())
    }

    /// Removes a link.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LinkNotFound`] if no equal link exists.
    pub fn disconnect(&mut self, link: &Link) -> Result<Link, GraphError> {
        self.dag
            .remove_edge(link)
            .map_err(|_| GraphError::LinkNotFound(link.clone()))
    }

    /// Iterates over links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.dag.edges()
    }

    /// Returns the number of links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.dag.edge_count()
    }

    /// Returns the links entering a node, in insertion order.
    #[must_use]
    pub fn incoming_links(&self, id: &NodeId) -> Vec<&Link> {
        self.dag.incoming_edges(id)
    }

    /// Returns the links leaving a node, in insertion order.
    #[must_use]
    pub fn outgoing_links(&self, id: &NodeId) -> Vec<&Link> {
        self.dag.outgoing_edges(id)
    }

    /// Returns the links attached to one port, in insertion order.
    #[must_use]
    pub fn links_at(&self, id: &NodeId, direction: Direction, key: &str) -> Vec<&Link> {
        let links = match direction {
            Direction::Input => self.incoming_links(id),
            Direction::Output => self.outgoing_links(id),
        };
        links
            .into_iter()
            .filter(|link| link.touches(id, direction, key))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ordering
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns every node ID in execution order.
    ///
    /// Sources precede their targets; independent nodes are grouped by rank
    /// and then ordered by insertion.
    #[must_use]
    pub fn topological_order(&self) -> &[NodeId] {
        self.dag.topological_order()
    }

    /// Returns the rank of each node, aligned with [`topological_order`](Self::topological_order).
    #[must_use]
    pub fn ranks(&self) -> &[usize] {
        self.dag.ranks()
    }

    /// Returns a node's rank: the length of the longest link path reaching it.
    #[must_use]
    pub fn rank(&self, id: &NodeId) -> Option<usize> {
        self.dag.rank(id)
    }

    /// Returns `true` if following links from `from` reaches `to`.
    #[must_use]
    pub fn has_path(&self, from: &NodeId, to: &NodeId) -> bool {
        self.dag.has_path(from, to)
    }

    /// Returns the underlying DAG.
    #[must_use]
    pub fn dag(&self) -> &Dag<NodeId, Link> {
        &self.dag
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Macros
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the macro behind a node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] or [`GraphError::NotAMacro`].
    pub fn macro_node(&self, id: &NodeId) -> Result<&MacroNode, GraphError> {
        self.node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?
            .as_macro()
            .ok_or_else(|| GraphError::NotAMacro(id.clone()))
    }

    /// Returns the macro behind a node, mutably.
    ///
    /// Editing the inner graph directly can leave published mappings pointing
    /// at removed nodes; such mappings surface as item-missing faults when the
    /// macro runs and as [`ValidationError::DanglingPublished`] from
    /// [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] or [`GraphError::NotAMacro`].
    pub fn macro_node_mut(&mut self, id: &NodeId) -> Result<&mut MacroNode, GraphError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?
            .operation_as_mut::<MacroNode>()
            .ok_or_else(|| GraphError::NotAMacro(id.clone()))
    }

    /// Exposes an inner node's port as a port of the macro node `macro_id`.
    ///
    /// The new port copies the inner port's type, validator, and flags. If
    /// `key` is taken on that side of the macro node, a numeric suffix is
    /// appended (`value_2`, `value_3`, ...). Returns the key actually used.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NodeNotFound`] / [`GraphError::NotAMacro`] for the macro
    /// - [`GraphError::NodeNotFound`] / [`GraphError::Field`] for the inner port
    /// - [`GraphError::AlreadyPublished`] if the inner port is already published
    /// - [`GraphError::InnerInputLinked`] if the inner input already has a link
    pub fn publish(
        &mut self,
        macro_id: &NodeId,
        direction: Direction,
        key: impl Into<FieldKey>,
        inner_node: &NodeId,
        inner_field: &str,
    ) -> Result<FieldKey, GraphError> {
        let key = key.into();
        let node = self
            .nodes
            .get_mut(macro_id)
            .ok_or_else(|| GraphError::NodeNotFound(macro_id.clone()))?;
        let (ports, macro_node) = node
            .macro_parts_mut()
            .ok_or_else(|| GraphError::NotAMacro(macro_id.clone()))?;

        let (field, mapping) =
            macro_node.prepare_publish(macro_id, ports, direction, key, inner_node, inner_field)?;
        let published_key = field.key().clone();
        ports.add(field).map_err(|source| GraphError::Field {
            node: macro_id.clone(),
            source,
        })?;
        macro_node.insert_mapping(mapping);
        Ok(published_key)
    }

    /// Removes the published port mapped to `inner_node.inner_field`.
    ///
    /// Every link attached to the published port is removed first. Returns
    /// the removed port and links.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NodeNotFound`] / [`GraphError::NotAMacro`] for the macro
    /// - [`GraphError::NotPublished`] if no such mapping exists
    pub fn unpublish(
        &mut self,
        macro_id: &NodeId,
        direction: Direction,
        inner_node: &NodeId,
        inner_field: &str,
    ) -> Result<(Field, Vec<Link>), GraphError> {
        let key = self
            .macro_node(macro_id)?
            .published_key_for(direction, inner_node, inner_field)
            .cloned()
            .ok_or_else(|| GraphError::NotPublished {
                macro_node: macro_id.clone(),
                direction,
                node: inner_node.clone(),
                field: FieldKey::new(inner_field),
            })?;

        let links = self
            .dag
            .remove_edges_where(|link| link.touches(macro_id, direction, key.as_str()));
        let node = self
            .nodes
            .get_mut(macro_id)
            .ok_or_else(|| GraphError::NodeNotFound(macro_id.clone()))?;
        let (ports, macro_node) = node
            .macro_parts_mut()
            .ok_or_else(|| GraphError::NotAMacro(macro_id.clone()))?;
        macro_node.forget(direction, key.as_str());
        let field = ports
            .remove(direction, key.as_str())
            .map_err(|source| GraphError::Field {
                node: macro_id.clone(),
                source,
            })?;
        Ok((field, links))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Extensions
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the graph's extension bag.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns the graph's extension bag mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation API
    // ─────────────────────────────────────────────────────────────────────────

    /// Checks the graph for problems that would fault a run.
    ///
    /// - required inputs with no link and no default
    /// - links whose ports no longer exist
    /// - published mappings naming removed inner nodes or ports (recursively)
    ///
    /// Inputs seeded directly into a context are invisible here, so an
    /// [`UnboundInput`](ValidationError::UnboundInput) is advisory when the
    /// caller seeds values.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        self.validate_into(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_into(&self, errors: &mut Vec<ValidationError>) {
        for link in self.links() {
            let source_ok = self
                .node(link.source())
                .is_some_and(|node| node.output(link.source_field().as_str()).is_some());
            let target_ok = self
                .node(link.target())
                .is_some_and(|node| node.input(link.target_field().as_str()).is_some());
            if !(source_ok && target_ok) {
                errors.push(ValidationError::DanglingLink(link.clone()));
            }
        }

        for node in self.nodes() {
            for field in node.inputs() {
                let linked = !self
                    .links_at(node.id(), Direction::Input, field.key().as_str())
                    .is_empty();
                if !linked && !field.is_optional() && field.default_value().is_none() {
                    errors.push(ValidationError::UnboundInput {
                        node: node.id().clone(),
                        field: field.key().clone(),
                    });
                }
            }

            if let Some(macro_node) = node.as_macro() {
                if let Err(missing) = macro_node.check_mappings(node.id()) {
                    errors.push(ValidationError::DanglingPublished(missing));
                }
                let mut inner = Vec::new();
                macro_node.graph().validate_into(&mut inner);
                errors.extend(inner.into_iter().filter_map(|error| match error {
                    // Inner inputs fed through the macro are bound from outside.
                    ValidationError::UnboundInput { node: inner_node, field }
                        if macro_node
                            .published_key_for(Direction::Input, &inner_node, field.as_str())
                            .is_some() =>
                    {
                        None
                    }
                    other => Some(ValidationError::Nested {
                        macro_node: node.id().clone(),
                        error: Box::new(other),
                    }),
                }));
            }
        }
    }

    fn link_error(link: &Link, err: DagError<NodeId>) -> GraphError {
        match err {
            DagError::InvalidEdge { reason, .. } => GraphError::InvalidLink {
                link: link.clone(),
                reason,
            },
            other => GraphError::from(other),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GraphError
// ─────────────────────────────────────────────────────────────────────────────

/// Structural errors. The graph is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// A node with this ID already exists.
    DuplicateNode(NodeId),
    /// No node with this ID exists.
    NodeNotFound(NodeId),
    /// The link would create a path from `to` back to `from`.
    CycleDetected {
        /// Source node of the rejected link.
        from: NodeId,
        /// Target node of the rejected link.
        to: NodeId,
    },
    /// The link breaks a structural rule.
    InvalidLink {
        /// The rejected link.
        link: Link,
        /// The broken rule.
        reason: InvalidEdge,
    },
    /// No equal link exists.
    LinkNotFound(Link),
    /// A port edit failed.
    Field {
        /// Owner of the port.
        node: NodeId,
        /// The underlying error.
        source: FieldError,
    },
    /// An operation declared ports that conflict, so no node was built.
    Declaration {
        /// Operation name or registry URI.
        operation: String,
        /// The underlying error.
        source: FieldError,
    },
    /// The input's validator rejects the output's declared type.
    IncompatibleTypes {
        /// The rejected link.
        link: Link,
        /// What the input accepts.
        expected: String,
        /// What the output declares.
        found: ValueType,
    },
    /// The input accepts a single link and already has one.
    InputAlreadyLinked {
        /// The rejected link.
        link: Link,
        /// The link already bound to the input.
        existing: Link,
    },
    /// The node does not own a sub-graph.
    NotAMacro(NodeId),
    /// The inner port is already published by this macro.
    AlreadyPublished {
        /// The macro node.
        macro_node: NodeId,
        /// The inner node.
        node: NodeId,
        /// The inner port.
        field: FieldKey,
    },
    /// The inner input is already fed by a link inside the macro.
    InnerInputLinked {
        /// The inner node.
        node: NodeId,
        /// The inner input.
        field: FieldKey,
    },
    /// The macro publishes no such inner port.
    NotPublished {
        /// The macro node.
        macro_node: NodeId,
        /// Side of the port.
        direction: Direction,
        /// The inner node.
        node: NodeId,
        /// The inner port.
        field: FieldKey,
    },
    /// A node type could not be instantiated.
    Registry(RegistryError),
    /// A described plain node carries no type URI to rebuild it from.
    MissingTypeUri(NodeId),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DuplicateNode(id) => write!(f, "duplicate node: {id}"),
            GraphError::NodeNotFound(id) => write!(f, "node not found: {id}"),
            GraphError::CycleDetected { from, to } => {
                write!(f, "link {from} -> {to} would create a cycle")
            }
            GraphError::InvalidLink { link, reason } => write!(f, "invalid link {link}: {reason}"),
            GraphError::LinkNotFound(link) => write!(f, "link not found: {link}"),
            GraphError::Field { node, source } => write!(f, "{node}: {source}"),
            GraphError::Declaration { operation, source } => {
                write!(f, "operation '{operation}' declared invalid ports: {source}")
            }
            GraphError::IncompatibleTypes {
                link,
                expected,
                found,
            } => write!(f, "link {link}: input expects {expected}, output declares {found}"),
            GraphError::InputAlreadyLinked { link, existing } => {
                write!(f, "link {link}: input already bound by {existing}")
            }
            GraphError::NotAMacro(id) => write!(f, "node {id} is not a macro"),
            GraphError::AlreadyPublished {
                macro_node,
                node,
                field,
            } => write!(f, "{node}.{field} is already published by {macro_node}"),
            GraphError::InnerInputLinked { node, field } => {
                write!(f, "{node}.{field} is already linked inside the macro")
            }
            GraphError::NotPublished {
                macro_node,
                direction,
                node,
                field,
            } => write!(f, "{macro_node} does not publish {direction} {node}.{field}"),
            GraphError::Registry(err) => write!(f, "{err}"),
            GraphError::MissingTypeUri(id) => write!(f, "node {id} has no type URI"),
        }
    }
}

impl core::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            GraphError::Field { source, .. } | GraphError::Declaration { source, .. } => {
                Some(source)
            }
            GraphError::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DagError<NodeId>> for GraphError {
    fn from(err: DagError<NodeId>) -> Self {
        match err {
            DagError::DuplicateVertex(id) => GraphError::DuplicateNode(id),
            DagError::VertexNotFound(id) => GraphError::NodeNotFound(id),
            DagError::CycleDetected { from, to } => GraphError::CycleDetected { from, to },
            DagError::InvalidEdge { from, to, reason } => GraphError::InvalidLink {
                link: Link::new(from, "?", to, "?"),
                reason,
            },
            DagError::EdgeNotFound { from, to } => {
                GraphError::LinkNotFound(Link::new(from, "?", to, "?"))
            }
        }
    }
}

impl From<RegistryError> for GraphError {
    fn from(err: RegistryError) -> Self {
        GraphError::Registry(err)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ValidationError
// ─────────────────────────────────────────────────────────────────────────────

/// A problem found by [`Graph::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required input has no link and no default.
    UnboundInput {
        /// The node.
        node: NodeId,
        /// The input.
        field: FieldKey,
    },
    /// A link refers to a port that no longer exists.
    DanglingLink(Link),
    /// A published mapping refers to an inner node or port that no longer exists.
    DanglingPublished(ItemMissingError),
    /// A problem inside a macro's graph.
    Nested {
        /// The macro node.
        macro_node: NodeId,
        /// The inner problem.
        error: Box<ValidationError>,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnboundInput { node, field } => {
                write!(f, "required input {node}.{field} has no link and no default")
            }
            ValidationError::DanglingLink(link) => {
                write!(f, "link {link} refers to a missing port")
            }
            ValidationError::DanglingPublished(err) => write!(f, "{err}"),
            ValidationError::Nested { macro_node, error } => {
                write!(f, "in macro {macro_node}: {error}")
            }
        }
    }
}

impl core::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use dagflow_system::error::NodeError;
    use dagflow_system::field::Ports;
    use dagflow_system::operation::OperateContext;

    struct Pass {
        ty: ValueType,
    }

    impl Operation for Pass {
        fn name(&self) -> &str {
            "pass"
        }

        fn declare(&self, ports: &mut Ports) -> Result<(), FieldError> {
            ports.add(Field::input("in", self.ty.clone()))?;
            ports.add(Field::output("out", self.ty.clone()))?;
            Ok(())
        }

        fn operate(&self, ctx: &mut OperateContext<'_>) -> Result<(), NodeError> {
            let value = ctx.input("in")?.clone();
            ctx.set_output("out", value);
            Ok(())
        }
    }

    fn pass(graph: &mut Graph, name: &str) -> NodeId {
        let node = Node::new(Pass { ty: ValueType::Int })
            .unwrap()
            .with_id(NodeId::from_string(name));
        graph.add_node(node).unwrap()
    }

    struct Twin;

    impl Operation for Twin {
        fn name(&self) -> &str {
            "twin"
        }

        fn declare(&self, ports: &mut Ports) -> Result<(), FieldError> {
            ports
                .add(Field::input("in", ValueType::Int))?
                .add(Field::input("in", ValueType::Text))?;
            Ok(())
        }

        fn operate(&self, _ctx: &mut OperateContext<'_>) -> Result<(), NodeError> {
            Ok(())
        }
    }

    #[test]
    fn conflicting_declaration_names_the_operation() {
        let mut graph = Graph::new();
        let err = graph.add_operation(Twin).unwrap_err();
        assert_eq!(
            err,
            GraphError::Declaration {
                operation: "twin".to_owned(),
                source: FieldError::DuplicateKey {
                    direction: Direction::Input,
                    key: FieldKey::new("in"),
                },
            }
        );
        assert!(err.to_string().starts_with("operation 'twin' declared invalid ports"));
        assert!(core::error::Error::source(&err).is_some());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn duplicate_node_id_rejected() {
        let mut graph = Graph::new();
        let a = pass(&mut graph, "a");
        let dup = Node::new(Pass { ty: ValueType::Int }).unwrap().with_id(a.clone());
        assert_eq!(graph.add_node(dup).unwrap_err(), GraphError::DuplicateNode(a));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn connect_checks_fields() {
        let mut graph = Graph::new();
        let a = pass(&mut graph, "a");
        let b = pass(&mut graph, "b");
        assert!(matches!(
            graph.connect(&a, "nope", &b, "in"),
            Err(GraphError::Field { .. })
        ));
        assert!(matches!(
            graph.connect(&a, "out", &b, "nope"),
            Err(GraphError::Field { .. })
        ));
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn connect_rejects_second_link_into_single_input() {
        let mut graph = Graph::new();
        let a = pass(&mut graph, "a");
        let b = pass(&mut graph, "b");
        let c = pass(&mut graph, "c");
        let first = graph.connect(&a, "out", &c, "in").unwrap();
        let err = graph.connect(&b, "out", &c, "in").unwrap_err();
        assert!(matches!(err, GraphError::InputAlreadyLinked { existing, .. } if existing == first));
    }

    #[test]
    fn connect_rejects_duplicate_as_invalid_link() {
        let mut graph = Graph::new();
        let a = pass(&mut graph, "a");
        let b = pass(&mut graph, "b");
        graph.connect(&a, "out", &b, "in").unwrap();
        assert!(matches!(
            graph.connect(&a, "out", &b, "in"),
            Err(GraphError::InvalidLink {
                reason: InvalidEdge::Duplicate,
                ..
            })
        ));
    }

    #[test]
    fn remove_field_cascades_links() {
        let mut graph = Graph::new();
        let a = pass(&mut graph, "a");
        let b = pass(&mut graph, "b");
        graph.connect(&a, "out", &b, "in").unwrap();

        let (field, links) = graph.remove_field(&b, Direction::Input, "in").unwrap();
        assert_eq!(field.key().as_str(), "in");
        assert_eq!(links.len(), 1);
        assert_eq!(graph.link_count(), 0);
        assert!(graph.node(&b).unwrap().input("in").is_none());
    }

    #[test]
    fn validate_reports_unbound_inputs() {
        let mut graph = Graph::new();
        let a = pass(&mut graph, "a");
        let b = pass(&mut graph, "b");
        graph.connect(&a, "out", &b, "in").unwrap();

        let errors = graph.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnboundInput {
                node: a,
                field: FieldKey::new("in"),
            }]
        );
    }

    #[test]
    fn error_display() {
        let err = GraphError::CycleDetected {
            from: NodeId::from_string("d"),
            to: NodeId::from_string("a"),
        };
        assert_eq!(err.to_string(), "link node_d -> node_a would create a cycle");
    }
}
