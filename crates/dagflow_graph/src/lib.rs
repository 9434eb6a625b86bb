//! Graph construction and stepping execution for dagflow (Layer 2).
//!
//! `dagflow_graph` wires [`Operation`](dagflow_system::operation::Operation)s
//! into an acyclic dataflow graph and runs it one node at a time.
//!
//! # Core Concepts
//!
//! - [`Dag`](dag::Dag) - Generic acyclic container with a cached topological order
//! - [`Node`] - An operation with identity, ports, and metadata
//! - [`Link`](link::Link) - A typed connection from an output port to an input port
//! - [`Graph`] - Nodes and links, checked on every mutation
//! - [`MacroNode`] - A node that owns a sub-graph and publishes inner ports
//! - [`Processor`] - Debugger-style stepping over a graph and a context
//!
//! # Example
//!
//! ```
//! use dagflow_graph::prelude::*;
//! use dagflow_system::prelude::*;
//!
//! struct Constant(i64);
//!
//! impl Operation for Constant {
//!     fn name(&self) -> &str {
//!         "constant"
//!     }
//!
//!     fn declare(&self, ports: &mut Ports) -> Result<(), FieldError> {
//!         ports.add(Field::output("value", ValueType::Int))?;
//!         Ok(())
//!     }
//!
//!     fn operate(&self, ctx: &mut OperateContext<'_>) -> Result<(), NodeError> {
//!         ctx.set_output("value", self.0);
//!         Ok(())
//!     }
//! }
//!
//! let mut graph = Graph::new();
//! let id = graph.add_operation(Constant(7)).unwrap();
//!
//! let mut processor = Processor::new(&graph);
//! processor.reset(Context::new());
//! assert_eq!(processor.step_all(), ProcessorState::Complete);
//!
//! let output = processor.context().find_child_context(&id).unwrap().output("value");
//! assert_eq!(output, Some(&Value::Int(7)));
//! ```
//!
//! # Architecture
//!
//! - **Layer 1** (`dagflow_system`): node-level primitives
//! - **Layer 2** (`dagflow_graph`): graphs, macros, and the stepping processor (this crate)
//! - **Layer 3** (plugins): tracing and other infrastructure

/// Generic directed acyclic graph.
pub mod dag;

/// Structural reflection for serializers.
pub mod descriptor;

/// Development tools for graph execution (NodeInfo, DevToolsPlugin).
pub mod dev;

/// The dataflow graph.
pub mod graph;

/// Lifecycle hooks for processor execution.
pub mod hooks;

/// Links between node ports.
pub mod link;

/// Nodes that own a sub-graph.
pub mod macro_node;

/// Graph nodes.
pub mod node;

/// Named bundles of hook registrations.
pub mod plugin;

/// The stepping processor.
pub mod processor;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::dag::{Dag, DagEdge, DagError, InvalidEdge};
    pub use crate::descriptor::{GraphDescriptor, MacroDescriptor, NodeDescriptor};
    pub use crate::dev::{DevToolsPlugin, ExecutionRecord, ExecutionRecorder, NodeInfo};
    pub use crate::graph::{Graph, GraphError, ValidationError};
    pub use crate::hooks::{HookRegistrationError, HooksAPI, ProcessorEvent};
    pub use crate::link::Link;
    pub use crate::macro_node::{MacroKind, MacroNode, PublishedField};
    pub use crate::node::Node;
    pub use crate::plugin::Plugin;
    pub use crate::processor::{
        HaltReason, Processor, ProcessorConfig, ProcessorState, StepError,
    };
}

// Re-export key types at crate root for convenience
pub use dev::DevToolsPlugin;
pub use graph::{Graph, GraphError, ValidationError};
pub use macro_node::MacroNode;
pub use node::Node;
pub use processor::{Processor, ProcessorConfig, ProcessorState};
