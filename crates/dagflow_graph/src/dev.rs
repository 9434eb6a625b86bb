//! Development tools for stepping and debugging.
//!
//! The [`DevToolsPlugin`] injects a [`NodeInfo`] into the processor's runtime
//! bag before each node operates, and can record every completed node into an
//! [`ExecutionRecorder`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use dagflow_graph::dev::{DevToolsPlugin, ExecutionRecorder};
//! use dagflow_graph::hooks::HooksAPI;
//!
//! let recorder = ExecutionRecorder::new();
//! let hooks = HooksAPI::new();
//! hooks
//!     .add_plugin(DevToolsPlugin::new().with_recorder(recorder.clone()))
//!     .unwrap();
//! let hooks = Arc::new(hooks);
//! // Processor::new(&graph).with_hooks(Arc::clone(&hooks)) ...
//! assert!(recorder.is_empty());
//! ```

use std::sync::Arc;

use dagflow_system::id::NodeId;
use parking_lot::Mutex;

use crate::hooks::schedule::{OnNodeComplete, OnNodeStart};
use crate::hooks::{HookRegistrationError, HooksAPI, ProcessorEvent};
use crate::plugin::Plugin;

/// The node currently operating, provided by [`DevToolsPlugin`].
///
/// Operations read it with `ctx.runtime().get::<NodeInfo>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    node_id: NodeId,
    name: String,
    depth: usize,
}

impl NodeInfo {
    /// Returns the ID of the operating node.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns the operating node's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the macro nesting depth of the operating node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// One completed node, as seen by an [`ExecutionRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    /// The node.
    pub node_id: NodeId,
    /// The node's display name.
    pub name: String,
    /// Macro nesting depth.
    pub depth: usize,
}

/// A shared log of completed nodes, in completion order.
///
/// Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRecorder {
    records: Arc<Mutex<Vec<ExecutionRecord>>>,
}

impl ExecutionRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the records so far.
    #[must_use]
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().clone()
    }

    /// Returns the display names of completed nodes, in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|record| record.name.clone())
            .collect()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drops every record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    fn push(&self, record: ExecutionRecord) {
        self.records.lock().push(record);
    }
}

/// Plugin providing [`NodeInfo`] and, optionally, execution recording.
#[derive(Debug, Clone, Default)]
pub struct DevToolsPlugin {
    recorder: Option<ExecutionRecorder>,
}

impl DevToolsPlugin {
    /// Creates the plugin without a recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every completed node into `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: ExecutionRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }
}

impl Plugin for DevToolsPlugin {
    fn build(&self, hooks: &HooksAPI) -> Result<(), HookRegistrationError> {
        hooks.register_provider::<OnNodeStart, NodeInfo, _>(
            "devtools_node_info",
            |event: &ProcessorEvent| match event {
                ProcessorEvent::NodeStart {
                    node_id,
                    name,
                    depth,
                } => Some(NodeInfo {
                    node_id: node_id.clone(),
                    name: name.clone(),
                    depth: *depth,
                }),
                _ => None,
            },
        )?;

        if let Some(recorder) = &self.recorder {
            let recorder = recorder.clone();
            hooks.register_observer::<OnNodeComplete, _>(
                "devtools_recorder",
                move |event: &ProcessorEvent| {
                    if let ProcessorEvent::NodeComplete {
                        node_id,
                        name,
                        depth,
                        ..
                    } = event
                    {
                        recorder.push(ExecutionRecord {
                            node_id: node_id.clone(),
                            name: name.clone(),
                            depth: *depth,
                        });
                    }
                },
            )?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "devtools"
    }
}
