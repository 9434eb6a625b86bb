//! Unified event enum for processor hooks.
//!
//! All hooks receive `&ProcessorEvent` and match on variants for typed access.
//!
//! # Example
//!
//! ```
//! use dagflow_graph::hooks::events::ProcessorEvent;
//!
//! fn handle_event(event: &ProcessorEvent) {
//!     match event {
//!         ProcessorEvent::NodeStart { name, depth, .. } => {
//!             println!("{name} starting at depth {depth}");
//!         }
//!         ProcessorEvent::NodeComplete { duration, .. } => {
//!             println!("completed in {duration:?}");
//!         }
//!         _ => {}
//!     }
//! }
//! ```

use core::fmt;
use core::time::Duration;

use dagflow_system::error::Fault;
use dagflow_system::id::NodeId;

/// Unified event enum for all processor hooks.
///
/// `depth` counts the macro levels enclosing the event's graph: `0` for the
/// graph a processor was created on, `1` inside a macro, and so on. Depth is
/// the same whether a macro is stepped into or run atomically.
#[derive(Debug, Clone)]
pub enum ProcessorEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Run Events
    // ─────────────────────────────────────────────────────────────────────────
    /// The first node of a run is about to execute.
    RunStart {
        /// Number of nodes in the processor's graph.
        node_count: usize,
        /// Nesting depth of the processor.
        depth: usize,
    },

    /// The topological order was exhausted without a fault.
    RunComplete {
        /// Number of nodes executed.
        nodes_executed: usize,
        /// Time since the run started.
        duration: Duration,
        /// Nesting depth of the processor.
        depth: usize,
    },

    /// A fault was latched.
    RunFailure {
        /// The latched fault.
        fault: Fault,
        /// Nesting depth of the processor.
        depth: usize,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Node Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A node is about to operate.
    NodeStart {
        /// The node.
        node_id: NodeId,
        /// The node's display name.
        name: String,
        /// Nesting depth of the node's graph.
        depth: usize,
    },

    /// A node operated successfully.
    NodeComplete {
        /// The node.
        node_id: NodeId,
        /// The node's display name.
        name: String,
        /// Nesting depth of the node's graph.
        depth: usize,
        /// How long the node took.
        duration: Duration,
    },

    /// A node failed.
    NodeError {
        /// The node.
        node_id: NodeId,
        /// The node's display name.
        name: String,
        /// Nesting depth of the node's graph.
        depth: usize,
        /// The error message.
        error: String,
    },

    /// The processor halted after a node with its breakpoint set.
    Breakpoint {
        /// The node.
        node_id: NodeId,
        /// The node's display name.
        name: String,
        /// Nesting depth of the node's graph.
        depth: usize,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Macro Events
    // ─────────────────────────────────────────────────────────────────────────
    /// Stepping entered a macro's sub-graph.
    FrameEnter {
        /// The macro node.
        node_id: NodeId,
        /// The macro's display name.
        name: String,
        /// Nesting depth of the entered sub-graph.
        depth: usize,
    },

    /// A stepped macro finished and control returned to its parent.
    FrameExit {
        /// The macro node.
        node_id: NodeId,
        /// The macro's display name.
        name: String,
        /// Nesting depth of the exited sub-graph.
        depth: usize,
        /// Time since the frame was entered.
        duration: Duration,
    },

    /// An iteration macro is about to run its sub-graph again.
    IterationStart {
        /// The macro node.
        node_id: NodeId,
        /// The macro's display name.
        name: String,
        /// The iteration about to run, 0-indexed.
        iteration: usize,
        /// Number of iterations this execution performs.
        max_iterations: usize,
    },
}

impl ProcessorEvent {
    /// Returns the schedule name for this event variant.
    ///
    /// This corresponds to the schedule marker type name (e.g., `OnNodeStart`).
    #[must_use]
    pub fn schedule_name(&self) -> &'static str {
        match self {
            ProcessorEvent::RunStart { .. } => "OnRunStart",
            ProcessorEvent::RunComplete { .. } => "OnRunComplete",
            ProcessorEvent::RunFailure { .. } => "OnRunFailure",
            ProcessorEvent::NodeStart { .. } => "OnNodeStart",
            ProcessorEvent::NodeComplete { .. } => "OnNodeComplete",
            ProcessorEvent::NodeError { .. } => "OnNodeError",
            ProcessorEvent::Breakpoint { .. } => "OnBreakpoint",
            ProcessorEvent::FrameEnter { .. } => "OnFrameEnter",
            ProcessorEvent::FrameExit { .. } => "OnFrameExit",
            ProcessorEvent::IterationStart { .. } => "OnIterationStart",
        }
    }

    /// Returns the node ID if this is a node-level event.
    #[must_use]
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            ProcessorEvent::RunStart { .. }
            | ProcessorEvent::RunComplete { .. }
            | ProcessorEvent::RunFailure { .. } => None,
            ProcessorEvent::NodeStart { node_id, .. }
            | ProcessorEvent::NodeComplete { node_id, .. }
            | ProcessorEvent::NodeError { node_id, .. }
            | ProcessorEvent::Breakpoint { node_id, .. }
            | ProcessorEvent::FrameEnter { node_id, .. }
            | ProcessorEvent::FrameExit { node_id, .. }
            | ProcessorEvent::IterationStart { node_id, .. } => Some(node_id),
        }
    }
}

impl fmt::Display for ProcessorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorEvent::RunStart { node_count, depth } => {
                write!(f, "RunStart(nodes: {node_count}, depth: {depth})")
            }
            ProcessorEvent::RunComplete {
                nodes_executed,
                duration,
                depth,
            } => write!(
                f,
                "RunComplete(executed: {nodes_executed}, duration: {duration:?}, depth: {depth})"
            ),
            ProcessorEvent::RunFailure { fault, depth } => {
                write!(f, "RunFailure(fault: {fault}, depth: {depth})")
            }
            ProcessorEvent::NodeStart {
                node_id,
                name,
                depth,
            } => write!(f, "NodeStart({name} @ {node_id}, depth: {depth})"),
            ProcessorEvent::NodeComplete {
                node_id,
                name,
                depth,
                duration,
            } => write!(
                f,
                "NodeComplete({name} @ {node_id}, depth: {depth}, duration: {duration:?})"
            ),
            ProcessorEvent::NodeError {
                node_id,
                name,
                depth,
                error,
            } => write!(f, "NodeError({name} @ {node_id}, depth: {depth}, error: {error})"),
            ProcessorEvent::Breakpoint {
                node_id,
                name,
                depth,
            } => write!(f, "Breakpoint({name} @ {node_id}, depth: {depth})"),
            ProcessorEvent::FrameEnter {
                node_id,
                name,
                depth,
            } => write!(f, "FrameEnter({name} @ {node_id}, depth: {depth})"),
            ProcessorEvent::FrameExit {
                node_id,
                name,
                depth,
                duration,
            } => write!(
                f,
                "FrameExit({name} @ {node_id}, depth: {depth}, duration: {duration:?})"
            ),
            ProcessorEvent::IterationStart {
                node_id,
                name,
                iteration,
                max_iterations,
            } => write!(
                f,
                "IterationStart({name} @ {node_id}, iteration: {iteration}/{max_iterations})"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_name_matches_marker() {
        let event = ProcessorEvent::Breakpoint {
            node_id: NodeId::from_string("a"),
            name: "const".to_owned(),
            depth: 0,
        };
        assert_eq!(event.schedule_name(), "OnBreakpoint");
        assert_eq!(event.node_id(), Some(&NodeId::from_string("a")));
    }

    #[test]
    fn run_events_have_no_node() {
        let event = ProcessorEvent::RunStart {
            node_count: 3,
            depth: 0,
        };
        assert!(event.node_id().is_none());
        assert_eq!(event.to_string(), "RunStart(nodes: 3, depth: 0)");
    }
}
