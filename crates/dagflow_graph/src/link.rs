//! Links between node ports.
//!
//! A link connects one node's output port to another node's input port. Links
//! refer to nodes by [`NodeId`] and to ports by [`FieldKey`]; the graph remains
//! the only owner of nodes.

use core::fmt;

use dagflow_system::field::{Direction, FieldKey};
use dagflow_system::id::NodeId;
use serde::{Deserialize, Serialize};

use crate::dag::DagEdge;

/// A typed connection from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    source: NodeId,
    source_field: FieldKey,
    target: NodeId,
    target_field: FieldKey,
}

impl Link {
    /// Creates a link from `source.source_field` to `target.target_field`.
    #[must_use]
    pub fn new(
        source: NodeId,
        source_field: impl Into<FieldKey>,
        target: NodeId,
        target_field: impl Into<FieldKey>,
    ) -> Self {
        Self {
            source,
            source_field: source_field.into(),
            target,
            target_field: target_field.into(),
        }
    }

    /// Returns the node producing the value.
    #[must_use]
    pub fn source(&self) -> &NodeId {
        &self.source
    }

    /// Returns the output port producing the value.
    #[must_use]
    pub fn source_field(&self) -> &FieldKey {
        &self.source_field
    }

    /// Returns the node consuming the value.
    #[must_use]
    pub fn target(&self) -> &NodeId {
        &self.target
    }

    /// Returns the input port consuming the value.
    #[must_use]
    pub fn target_field(&self) -> &FieldKey {
        &self.target_field
    }

    /// Returns `true` if this link is attached to the given port.
    #[must_use]
    pub fn touches(&self, node: &NodeId, direction: Direction, key: &str) -> bool {
        match direction {
            Direction::Output => self.source == *node && self.source_field.as_str() == key,
            Direction::Input => self.target == *node && self.target_field.as_str() == key,
        }
    }

    /// Returns `true` if either endpoint is `node`.
    #[must_use]
    pub fn involves(&self, node: &NodeId) -> bool {
        self.source == *node || self.target == *node
    }
}

impl DagEdge<NodeId> for Link {
    fn source(&self) -> &NodeId {
        &self.source
    }

    fn target(&self) -> &NodeId {
        &self.target
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source, self.source_field, self.target, self.target_field
        )
    }
}
