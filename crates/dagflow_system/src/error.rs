//! Runtime error taxonomy.
//!
//! Operations fail with a [`NodeError`]. The processor wraps it in a
//! [`ProcessingError`] naming the node, and latches the result as a [`Fault`].
//! References to ports or nodes that no longer exist are reported separately
//! as [`ItemMissingError`], since they point at a caller/engine mismatch
//! rather than at a node's logic.

use crate::field::{Direction, FieldKey};
use crate::id::NodeId;
use crate::value::Value;

/// Failure raised from inside an operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeError {
    /// A required input had no value.
    #[error("missing required input '{0}'")]
    MissingInput(FieldKey),

    /// A value was rejected by the port's validator.
    #[error("invalid value for '{field}': expected {expected}, found {found}")]
    InvalidValue {
        /// The rejecting port.
        field: FieldKey,
        /// Description of what the port accepts.
        expected: String,
        /// The rejected value.
        found: Value,
    },

    /// The operation's own logic failed.
    #[error("{0}")]
    Failed(String),

    /// Cancellation was requested while the operation ran.
    #[error("operation canceled")]
    Canceled,

    /// A nested graph run by this node faulted.
    #[error("sub-graph faulted: {0}")]
    Subgraph(Box<Fault>),
}

impl NodeError {
    /// Shorthand for [`NodeError::Failed`].
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A [`NodeError`] attributed to the node that raised it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("node '{name}' ({node}) failed: {error}")]
pub struct ProcessingError {
    /// The failing node.
    pub node: NodeId,
    /// The failing node's display name.
    pub name: String,
    /// What went wrong.
    #[source]
    pub error: NodeError,
}

impl ProcessingError {
    /// Creates a processing error.
    #[must_use]
    pub fn new(node: NodeId, name: impl Into<String>, error: NodeError) -> Self {
        Self {
            node,
            name: name.into(),
            error,
        }
    }
}

/// A referenced node or port no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemMissingError {
    /// The node was removed.
    #[error("node not found: {0}")]
    Node(NodeId),

    /// The port was removed from its node.
    #[error("{direction} field '{key}' not found on {node}")]
    Field {
        /// Owner of the port.
        node: NodeId,
        /// Side of the port.
        direction: Direction,
        /// The missing key.
        key: FieldKey,
    },

    /// A macro's published port points at an inner node or port that is gone.
    #[error("published {direction} '{key}' on {macro_node} maps to missing {node}.{field}")]
    PublishedTarget {
        /// The macro node.
        macro_node: NodeId,
        /// Side of the published port.
        direction: Direction,
        /// The published key.
        key: FieldKey,
        /// The inner node the mapping names.
        node: NodeId,
        /// The inner port the mapping names.
        field: FieldKey,
    },
}

/// A latched processor fault.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Fault {
    /// A node's operation failed.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// The graph no longer contains something the run depends on.
    #[error(transparent)]
    ItemMissing(#[from] ItemMissingError),

    /// Macro nesting went deeper than the configured limit.
    #[error("nesting depth {depth} exceeds the limit of {limit} at {node}")]
    NestingLimit {
        /// The macro that would have exceeded the limit.
        node: NodeId,
        /// Depth the macro would have run at.
        depth: usize,
        /// Configured limit.
        limit: usize,
    },
}

impl Fault {
    /// Returns `true` if the fault stems from cancellation, at any nesting level.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        match self {
            Fault::Processing(ProcessingError { error, .. }) => match error {
                NodeError::Canceled => true,
                NodeError::Subgraph(inner) => inner.is_canceled(),
                _ => false,
            },
            Fault::ItemMissing(_) | Fault::NestingLimit { .. } => false,
        }
    }

    /// Returns `true` for [`Fault::ItemMissing`], at any nesting level.
    #[must_use]
    pub fn is_item_missing(&self) -> bool {
        match self {
            Fault::ItemMissing(_) => true,
            Fault::Processing(ProcessingError {
                error: NodeError::Subgraph(inner),
                ..
            }) => inner.is_item_missing(),
            _ => false,
        }
    }

    /// Returns the node the fault is attributed to, if any.
    #[must_use]
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Fault::Processing(err) => Some(&err.node),
            Fault::NestingLimit { node, .. }
            | Fault::ItemMissing(
                ItemMissingError::Node(node) | ItemMissingError::Field { node, .. },
            ) => Some(node),
            Fault::ItemMissing(ItemMissingError::PublishedTarget { macro_node, .. }) => {
                Some(macro_node)
            }
        }
    }

    /// Follows nested sub-graph faults down to the innermost one.
    #[must_use]
    pub fn innermost(&self) -> &Fault {
        match self {
            Fault::Processing(ProcessingError {
                error: NodeError::Subgraph(inner),
                ..
            }) => inner.innermost(),
            other => other,
        }
    }
}
