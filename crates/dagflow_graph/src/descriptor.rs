//! Structural reflection for external serializers.
//!
//! [`Graph::describe`] flattens a graph into plain, serde-serializable data;
//! [`Graph::restore`] rebuilds it, instantiating plain nodes through a
//! [`NodeRegistry`]. The wire format is left to the caller.

use dagflow_system::field::{Direction, FieldKey, Ports};
use dagflow_system::id::NodeId;
use dagflow_system::registry::NodeRegistry;
use serde::{Deserialize, Serialize};

use crate::graph::{Graph, GraphError};
use crate::link::Link;
use crate::macro_node::{MacroKind, MacroNode, PublishedField};
use crate::node::Node;

/// A graph's nodes and links, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDescriptor {
    /// Every node.
    pub nodes: Vec<NodeDescriptor>,
    /// Every link.
    pub links: Vec<Link>,
}

/// One node and its ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Node ID.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Category.
    pub category: String,
    /// Registry URI, required to restore a plain node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_uri: Option<String>,
    /// Breakpoint flag.
    #[serde(default)]
    pub breakpoint: bool,
    /// Every port, including ports added after construction.
    pub ports: Ports,
    /// The sub-graph, for macro nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_graph: Option<MacroDescriptor>,
}

/// A macro node's sub-graph and its published mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDescriptor {
    /// Single or iteration.
    pub kind: MacroKind,
    /// The inner graph.
    pub graph: GraphDescriptor,
    /// Published port mappings.
    pub published: Vec<PublishedField>,
}

impl Graph {
    /// Describes the graph's structure, recursing into macro nodes.
    #[must_use]
    pub fn describe(&self) -> GraphDescriptor {
        GraphDescriptor {
            nodes: self.nodes().map(describe_node).collect(),
            links: self.links().cloned().collect(),
        }
    }

    /// Rebuilds a graph from a descriptor.
    ///
    /// Plain nodes are instantiated from `registry` by type URI; ports in the
    /// descriptor that the operation does not declare are added back. Links are
    /// re-checked as they are reconnected.
    ///
    /// # Errors
    ///
    /// - [`GraphError::MissingTypeUri`] for a plain node without a URI
    /// - [`GraphError::Registry`] for an unknown URI
    /// - any [`GraphError`] the rebuilt links or ports fail with
    pub fn restore(
        descriptor: &GraphDescriptor,
        registry: &NodeRegistry,
    ) -> Result<Graph, GraphError> {
        let mut graph = Graph::new();
        for node in &descriptor.nodes {
            graph.add_node(restore_node(node, registry)?)?;
        }
        for link in &descriptor.links {
            graph.connect(
                link.source(),
                link.source_field().as_str(),
                link.target(),
                link.target_field().as_str(),
            )?;
        }
        tracing::debug!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            "graph restored"
        );
        Ok(graph)
    }
}

fn describe_node(node: &Node) -> NodeDescriptor {
    NodeDescriptor {
        id: node.id().clone(),
        name: node.name().to_owned(),
        category: node.category().to_owned(),
        type_uri: node.type_uri().map(str::to_owned),
        breakpoint: node.has_breakpoint(),
        ports: node.ports().clone(),
        macro_graph: node.as_macro().map(|macro_node| MacroDescriptor {
            kind: macro_node.kind(),
            graph: macro_node.graph().describe(),
            published: macro_node.published().to_vec(),
        }),
    }
}

fn restore_node(descriptor: &NodeDescriptor, registry: &NodeRegistry) -> Result<Node, GraphError> {
    let field_error = |source| GraphError::Field {
        node: descriptor.id.clone(),
        source,
    };

    let mut node = match (&descriptor.macro_graph, &descriptor.type_uri) {
        (Some(inner), _) => {
            let mut macro_node = match inner.kind {
                MacroKind::Single => MacroNode::new(&descriptor.name),
                MacroKind::Iteration => MacroNode::iteration(&descriptor.name),
            }
            .with_graph(Graph::restore(&inner.graph, registry)?);
            for mapping in &inner.published {
                macro_node.insert_mapping(mapping.clone());
            }
            Node::new(macro_node).map_err(field_error)?
        }
        (None, Some(uri)) => Node::from_registry(registry, uri)?,
        (None, None) => return Err(GraphError::MissingTypeUri(descriptor.id.clone())),
    };

    // The described ports win over the declared ones.
    let dropped: Vec<(Direction, FieldKey)> = node
        .inputs()
        .iter()
        .chain(node.outputs())
        .filter(|field| {
            !descriptor
                .ports
                .contains(field.direction(), field.key().as_str())
        })
        .map(|field| (field.direction(), field.key().clone()))
        .collect();
    for (direction, key) in dropped {
        node.remove_field(direction, key.as_str()).map_err(field_error)?;
    }
    for field in descriptor.ports.inputs().iter().chain(descriptor.ports.outputs()) {
        if node.field(field.direction(), field.key().as_str()).is_none() {
            node.add_field(field.clone()).map_err(field_error)?;
        }
    }

    let mut node = node
        .with_id(descriptor.id.clone())
        .with_name(&descriptor.name)
        .with_category(&descriptor.category)
        .with_breakpoint(descriptor.breakpoint);
    if let Some(uri) = &descriptor.type_uri {
        node = node.with_type_uri(uri);
    }
    Ok(node)
}
