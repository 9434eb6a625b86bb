//! The stepping processor.
//!
//! A [`Processor`] executes a [`Graph`] one node at a time, in topological
//! order, against a hierarchical [`Context`]. It is a debugger-style state
//! machine:
//!
//! - [`step`](Processor::step) runs the next node (a macro runs atomically)
//! - [`step_to_next_level`](Processor::step_to_next_level) finishes the current rank
//! - [`step_into`](Processor::step_into) / [`step_out_of`](Processor::step_out_of)
//!   push and pop frames for macro sub-graphs
//! - [`step_all`](Processor::step_all) runs until the order is exhausted or
//!   something halts the run
//!
//! Node failures never escape the stepping API. They are latched and read back
//! with [`error`](Processor::error); a latched fault stops the run until
//! [`reset`](Processor::reset).
//!
//! # Context layout
//!
//! Each node's ports live in its own child context: node `n` of the root graph
//! uses `root.child(n)`, and node `i` inside macro `m` uses
//! `root.child(m).child(i)`.
//!
//! # Example
//!
//! ```
//! use dagflow_graph::graph::Graph;
//! use dagflow_graph::processor::{Processor, ProcessorState};
//! use dagflow_system::context::Context;
//!
//! let graph = Graph::new();
//! let mut processor = Processor::new(&graph);
//! processor.reset(Context::new());
//! assert_eq!(processor.step_all(), ProcessorState::Complete);
//! ```

use core::fmt;
use std::sync::Arc;
use std::time::Instant;

use dagflow_system::cancel::CancelToken;
use dagflow_system::context::{Context, Slot};
use dagflow_system::error::{Fault, ItemMissingError, NodeError, ProcessingError};
use dagflow_system::extension::Extensions;
use dagflow_system::field::{Direction, Field};
use dagflow_system::id::NodeId;
use dagflow_system::operation::OperateContext;
use dagflow_system::schedule::{Schedule, ScheduleId};
use dagflow_system::value::Value;

use crate::graph::Graph;
use crate::hooks::schedule::{
    OnBreakpoint, OnFrameEnter, OnFrameExit, OnIterationStart, OnNodeComplete, OnNodeError,
    OnNodeStart, OnRunComplete, OnRunFailure, OnRunStart,
};
use crate::hooks::{HooksAPI, ProcessorEvent};
use crate::link::Link;
use crate::macro_node::{IterationPlan, MacroNode};
use crate::node::Node;

// ─────────────────────────────────────────────────────────────────────────────
// ProcessorConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Settings for a [`Processor`], inherited by the processors of nested macros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    max_nesting_depth: usize,
    ignore_breakpoints: bool,
    runtime_validation: bool,
    max_iterations: Option<usize>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorConfig {
    /// Default limit on macro nesting.
    pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_nesting_depth: Self::DEFAULT_MAX_NESTING_DEPTH,
            ignore_breakpoints: false,
            runtime_validation: true,
            max_iterations: None,
        }
    }

    /// Sets how deep macros may nest before the run faults with
    /// [`Fault::NestingLimit`].
    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Runs straight through nodes with their breakpoint set.
    #[must_use]
    pub fn with_ignore_breakpoints(mut self, ignore: bool) -> Self {
        self.ignore_breakpoints = ignore;
        self
    }

    /// Enables or disables re-validating values against port validators at
    /// execution time.
    #[must_use]
    pub fn with_runtime_validation(mut self, enabled: bool) -> Self {
        self.runtime_validation = enabled;
        self
    }

    /// Caps the number of iterations any iteration macro performs.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Returns the nesting limit.
    #[must_use]
    pub fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }

    /// Returns `true` if breakpoints are ignored.
    #[must_use]
    pub fn ignore_breakpoints(&self) -> bool {
        self.ignore_breakpoints
    }

    /// Returns `true` if values are re-validated at execution time.
    #[must_use]
    pub fn runtime_validation(&self) -> bool {
        self.runtime_validation
    }

    /// Returns the iteration cap, if any.
    #[must_use]
    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// States
// ─────────────────────────────────────────────────────────────────────────────

/// Why a processor halted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// The named node has its breakpoint set and just executed. Stepping resumes.
    Breakpoint(NodeId),
    /// The run was canceled. A canceled fault is latched.
    Canceled,
}

/// The processor's position in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorState {
    /// Reset, nothing executed yet.
    Idle,
    /// At least one node executed and more remain.
    Running,
    /// The topological order is exhausted.
    Complete,
    /// A node failed; see [`Processor::error`].
    Errored,
    /// Stopped at a breakpoint or by cancellation.
    Halted(HaltReason),
}

impl ProcessorState {
    /// Returns `true` for [`ProcessorState::Halted`].
    #[must_use]
    pub fn is_halted(&self) -> bool {
        matches!(self, ProcessorState::Halted(_))
    }
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorState::Idle => write!(f, "idle"),
            ProcessorState::Running => write!(f, "running"),
            ProcessorState::Complete => write!(f, "complete"),
            ProcessorState::Errored => write!(f, "errored"),
            ProcessorState::Halted(HaltReason::Breakpoint(node)) => {
                write!(f, "halted at breakpoint {node}")
            }
            ProcessorState::Halted(HaltReason::Canceled) => write!(f, "halted: canceled"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StepError
// ─────────────────────────────────────────────────────────────────────────────

/// Misuse of the frame-stepping API. Nothing is latched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The processor has nothing left to run in its current state.
    NotRunnable(ProcessorState),
    /// Only the node at the cursor can be stepped into.
    NotNextNode {
        /// The node at the cursor.
        expected: NodeId,
        /// The node the caller asked for.
        requested: NodeId,
    },
    /// The node does not own a sub-graph.
    NotAMacro(NodeId),
    /// Stepping is at the outermost frame.
    NoEnclosingFrame,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::NotRunnable(state) => write!(f, "processor is not runnable: {state}"),
            StepError::NotNextNode {
                expected,
                requested,
            } => write!(f, "cannot step into {requested}: next node is {expected}"),
            StepError::NotAMacro(node) => write!(f, "cannot step into {node}: not a macro"),
            StepError::NoEnclosingFrame => write!(f, "already at the outermost frame"),
        }
    }
}

impl core::error::Error for StepError {}

// ─────────────────────────────────────────────────────────────────────────────
// ProcessorRuntime
// ─────────────────────────────────────────────────────────────────────────────

/// Settings a macro needs to run its sub-graph the way its parent runs.
///
/// Installed into the runtime bag before every operation.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProcessorRuntime {
    config: ProcessorConfig,
    hooks: Option<Arc<HooksAPI>>,
    depth: usize,
}

impl ProcessorRuntime {
    pub(crate) fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// The runtime of a sub-graph run atomically by a macro at this depth.
    pub(crate) fn nested(self) -> Self {
        Self {
            config: self.config.with_ignore_breakpoints(true),
            hooks: self.hooks,
            depth: self.depth + 1,
        }
    }

    pub(crate) fn emit<S: Schedule>(&self, event: &ProcessorEvent) {
        if let Some(hooks) = &self.hooks {
            hooks.invoke(ScheduleId::of::<S>(), &mut Extensions::new(), event);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frames
// ─────────────────────────────────────────────────────────────────────────────

struct Frame<'g> {
    graph: &'g Graph,
    cursor: usize,
    /// Context path of the frame's scope; empty for the outermost frame.
    path: Vec<NodeId>,
    owner: Option<FrameOwner<'g>>,
}

struct FrameOwner<'g> {
    node: &'g Node,
    macro_node: &'g MacroNode,
    iteration: Option<IterationPlan>,
    entered_at: Instant,
}

impl<'g> Frame<'g> {
    fn root(graph: &'g Graph) -> Self {
        Self {
            graph,
            cursor: 0,
            path: Vec::new(),
            owner: None,
        }
    }

    fn next(&self) -> Option<&'g NodeId> {
        let graph: &'g Graph = self.graph;
        graph.topological_order().get(self.cursor)
    }

    fn node_path(&self, node: &NodeId) -> Vec<NodeId> {
        let mut path = self.path.clone();
        path.push(node.clone());
        path
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Processor
// ─────────────────────────────────────────────────────────────────────────────

/// Steps through a graph in topological order.
///
/// The processor borrows its graph, so the graph cannot change while a run is
/// in progress.
pub struct Processor<'g> {
    graph: &'g Graph,
    config: ProcessorConfig,
    hooks: Option<Arc<HooksAPI>>,
    depth: usize,
    frames: Vec<Frame<'g>>,
    context: Context,
    state: ProcessorState,
    fault: Option<Fault>,
    cancel: CancelToken,
    owns_cancel: bool,
    runtime: Extensions,
    nodes_executed: usize,
    started_at: Option<Instant>,
}

impl<'g> Processor<'g> {
    /// Creates an idle processor with an empty context.
    #[must_use]
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            config: ProcessorConfig::new(),
            hooks: None,
            depth: 0,
            frames: vec![Frame::root(graph)],
            context: Context::new(),
            state: ProcessorState::Idle,
            fault: None,
            cancel: CancelToken::new(),
            owns_cancel: true,
            runtime: Extensions::new(),
            nodes_executed: 0,
            started_at: None,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    /// Invokes `hooks` while stepping. Nested macro runs share them.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<HooksAPI>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// A processor for a sub-graph run atomically by a macro.
    pub(crate) fn nested(graph: &'g Graph, runtime: &ProcessorRuntime, cancel: CancelToken) -> Self {
        Self {
            config: runtime.config.clone(),
            hooks: runtime.hooks.clone(),
            depth: runtime.depth,
            cancel,
            owns_cancel: false,
            ..Self::new(graph)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Rebinds to `context` and rewinds to the first node.
    ///
    /// Clears any latched fault, pops every frame, and returns to
    /// [`ProcessorState::Idle`]. A processor created with [`Processor::new`]
    /// also clears a pending cancellation.
    pub fn reset(&mut self, context: Context) {
        let _ = self.graph.topological_order();
        self.context = context;
        self.frames = vec![Frame::root(self.graph)];
        self.state = ProcessorState::Idle;
        self.fault = None;
        self.runtime = Extensions::new();
        self.nodes_executed = 0;
        self.started_at = None;
        if self.owns_cancel {
            self.cancel.reset();
        }
    }

    /// Returns `true` while nodes remain and nothing terminal happened.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.fault.is_none()
            && matches!(
                self.state,
                ProcessorState::Idle
                    | ProcessorState::Running
                    | ProcessorState::Halted(HaltReason::Breakpoint(_))
            )
            && self.current_node().is_some()
    }

    /// Executes the node at the cursor and advances past it.
    ///
    /// A macro node runs its whole sub-graph, ignoring inner breakpoints. If
    /// the executed node has its breakpoint set, the processor halts with
    /// [`HaltReason::Breakpoint`]; the next step resumes.
    pub fn step(&mut self) -> ProcessorState {
        if !self.has_next() {
            self.settle();
            return self.state.clone();
        }
        self.begin_run();
        if self.run_next() {
            self.unwind();
            if self.state == ProcessorState::Running {
                self.settle();
            }
        }
        self.state.clone()
    }

    /// Steps until the next node has a different rank than the one at the
    /// cursor now, leaves the current frame, or the run halts.
    pub fn step_to_next_level(&mut self) -> ProcessorState {
        let Some(rank) = self.current_rank() else {
            return self.step();
        };
        let frames = self.frames.len();
        loop {
            let state = self.step();
            if !self.has_next()
                || state.is_halted()
                || self.frames.len() != frames
                || self.current_rank() != Some(rank)
            {
                return state;
            }
        }
    }

    /// Pushes a frame for the macro at the cursor and stops before its first
    /// inner node.
    ///
    /// Inner nodes are then stepped one at a time and their breakpoints are
    /// honoured. When the last inner node finishes, the frame pops and the
    /// macro counts as executed in its parent.
    ///
    /// # Errors
    ///
    /// - [`StepError::NotRunnable`] if nothing can run
    /// - [`StepError::NotNextNode`] if `node` is not at the cursor
    /// - [`StepError::NotAMacro`] if `node` has no sub-graph
    pub fn step_into(&mut self, node: &NodeId) -> Result<ProcessorState, StepError> {
        if !self.has_next() {
            return Err(StepError::NotRunnable(self.state.clone()));
        }
        let top = self.frames.len() - 1;
        let graph: &'g Graph = self.frames[top].graph;
        let Some(expected) = self.frames[top].next() else {
            return Err(StepError::NotRunnable(self.state.clone()));
        };
        if expected != node {
            return Err(StepError::NotNextNode {
                expected: expected.clone(),
                requested: node.clone(),
            });
        }
        let Some(target) = graph.node(expected) else {
            self.begin_run();
            self.latch(Fault::ItemMissing(ItemMissingError::Node(expected.clone())));
            return Ok(self.state.clone());
        };
        let Some(macro_node) = target.as_macro() else {
            return Err(StepError::NotAMacro(node.clone()));
        };

        self.begin_run();
        if self.cancel.is_canceled() {
            self.latch_canceled(target);
            return Ok(self.state.clone());
        }
        self.state = ProcessorState::Running;

        let depth = self.depth + top;
        if !self.check_nesting(target, depth) {
            return Ok(self.state.clone());
        }
        let frame_path = self.frames[top].path.clone();
        if let Err(error) = self.gather_inputs(graph, target, &frame_path) {
            self.node_failed(target, depth, error);
            return Ok(self.state.clone());
        }
        if let Err(missing) = macro_node.check_mappings(target.id()) {
            self.latch(Fault::ItemMissing(missing));
            return Ok(self.state.clone());
        }

        self.emit::<OnNodeStart>(&ProcessorEvent::NodeStart {
            node_id: target.id().clone(),
            name: target.name().to_owned(),
            depth,
        });
        self.emit::<OnFrameEnter>(&ProcessorEvent::FrameEnter {
            node_id: target.id().clone(),
            name: target.name().to_owned(),
            depth: depth + 1,
        });
        tracing::debug!(node = %target.id(), name = target.name(), depth, "stepping into macro");

        let path = self.frames[top].node_path(target.id());
        let scope = self.context.descend_mut(&path);
        let iteration = if macro_node.is_iteration() {
            scope.clear_children();
            let plan = macro_node.plan_iterations(scope, self.config.max_iterations());
            if !plan.is_finished() {
                plan.load(scope);
            }
            Some(plan)
        } else {
            macro_node.load_inputs(scope);
            None
        };
        if let Some(plan) = iteration.as_ref().filter(|plan| !plan.is_finished()) {
            let event = ProcessorEvent::IterationStart {
                node_id: target.id().clone(),
                name: target.name().to_owned(),
                iteration: plan.index(),
                max_iterations: plan.max(),
            };
            self.emit::<OnIterationStart>(&event);
        }

        // A zero-iteration frame starts exhausted and pops straight away.
        let cursor = match &iteration {
            Some(plan) if plan.is_finished() => macro_node.graph().node_count(),
            _ => 0,
        };
        self.frames.push(Frame {
            graph: macro_node.graph(),
            cursor,
            path,
            owner: Some(FrameOwner {
                node: target,
                macro_node,
                iteration,
                entered_at: Instant::now(),
            }),
        });
        self.unwind();
        if self.state == ProcessorState::Running {
            self.settle();
        }
        Ok(self.state.clone())
    }

    /// Runs the rest of the current frame and resumes the parent's cursor.
    ///
    /// Stops early at a breakpoint or on a fault.
    ///
    /// # Errors
    ///
    /// - [`StepError::NoEnclosingFrame`] at the outermost frame
    /// - [`StepError::NotRunnable`] if nothing can run
    pub fn step_out_of(&mut self) -> Result<ProcessorState, StepError> {
        if self.frames.len() == 1 {
            return Err(StepError::NoEnclosingFrame);
        }
        if !self.has_next() {
            return Err(StepError::NotRunnable(self.state.clone()));
        }
        let frames = self.frames.len();
        while self.frames.len() >= frames && self.has_next() {
            if self.step().is_halted() {
                break;
            }
        }
        Ok(self.state.clone())
    }

    /// Steps until the order is exhausted, a fault is latched, or the run halts.
    pub fn step_all(&mut self) -> ProcessorState {
        loop {
            if !self.has_next() {
                self.settle();
                return self.state.clone();
            }
            let state = self.step();
            if state.is_halted() || state == ProcessorState::Errored {
                return state;
            }
        }
    }

    /// Requests cancellation. The next step latches a canceled fault.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &ProcessorState {
        &self.state
    }

    /// Returns the latched fault, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Returns the breakpoint node the processor is halted at.
    #[must_use]
    pub fn halted_at(&self) -> Option<&NodeId> {
        match &self.state {
            ProcessorState::Halted(HaltReason::Breakpoint(node)) => Some(node),
            _ => None,
        }
    }

    /// Returns the node at the cursor of the innermost frame.
    ///
    /// After a fault this is the node that failed.
    #[must_use]
    pub fn current_node(&self) -> Option<&NodeId> {
        self.frames.last().and_then(Frame::next)
    }

    /// Returns the number of macro frames stepped into. `0` at the outermost frame.
    #[must_use]
    pub fn frame_depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Returns the number of nodes executed since the last reset.
    ///
    /// A macro run atomically counts once; a stepped macro counts its inner
    /// nodes plus itself.
    #[must_use]
    pub fn nodes_executed(&self) -> usize {
        self.nodes_executed
    }

    /// Returns the graph being processed.
    #[must_use]
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Returns the root context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the root context mutably, for seeding inputs between steps.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Consumes the processor and returns the root context.
    #[must_use]
    pub fn into_context(self) -> Context {
        self.context
    }

    /// Returns the cancellation token. Clone it to cancel from another thread.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs the node at the innermost cursor. Returns `true` if it completed.
    fn run_next(&mut self) -> bool {
        let top = self.frames.len() - 1;
        let graph: &'g Graph = self.frames[top].graph;
        let Some(node_id) = self.frames[top].next() else {
            return false;
        };
        let Some(node) = graph.node(node_id) else {
            self.latch(Fault::ItemMissing(ItemMissingError::Node(node_id.clone())));
            return false;
        };
        if self.cancel.is_canceled() {
            self.latch_canceled(node);
            return false;
        }
        self.state = ProcessorState::Running;

        let depth = self.depth + top;
        if node.is_macro() && !self.check_nesting(node, depth) {
            return false;
        }
        let frame_path = self.frames[top].path.clone();
        if let Err(error) = self.gather_inputs(graph, node, &frame_path) {
            self.node_failed(node, depth, error);
            return false;
        }

        self.emit::<OnNodeStart>(&ProcessorEvent::NodeStart {
            node_id: node_id.clone(),
            name: node.name().to_owned(),
            depth,
        });
        self.runtime.insert(ProcessorRuntime {
            config: self.config.clone(),
            hooks: self.hooks.clone(),
            depth,
        });

        let path = self.frames[top].node_path(node_id);
        let span = tracing::debug_span!("node", node = %node_id, name = node.name(), depth);
        let _enter = span.enter();
        let started = Instant::now();

        let result = {
            let scope = self.context.descend_mut(&path);
            let mut ctx = OperateContext::new(node_id, scope, &self.runtime, &self.cancel);
            node.operation().operate(&mut ctx)
        };
        let result = result.and_then(|()| self.check_outputs(node, &path));

        if let Err(error) = result {
            self.node_failed(node, depth, error);
            return false;
        }

        self.frames[top].cursor += 1;
        self.nodes_executed += 1;
        let duration = started.elapsed();
        tracing::trace!(?duration, "node complete");
        self.emit::<OnNodeComplete>(&ProcessorEvent::NodeComplete {
            node_id: node_id.clone(),
            name: node.name().to_owned(),
            depth,
            duration,
        });
        self.check_breakpoint(node, depth);
        true
    }

    /// Fills `node`'s input slots within the frame scope at `frame_path`.
    fn gather_inputs(
        &mut self,
        graph: &Graph,
        node: &Node,
        frame_path: &[NodeId],
    ) -> Result<(), NodeError> {
        let validate = self.config.runtime_validation();
        let scope = self.context.descend_mut(frame_path);

        for field in node.inputs() {
            let links = graph.links_at(node.id(), Direction::Input, field.key().as_str());
            let slot = Slot::from(field);

            let value = if links.is_empty() {
                scope
                    .find_child_context(node.id())
                    .and_then(|own| own.get(&slot))
                    .cloned()
            } else if field.is_multi() {
                Some(Value::List(
                    links
                        .iter()
                        .filter_map(|link| linked_value(scope, link))
                        .collect(),
                ))
            } else {
                links.first().and_then(|link| linked_value(scope, link))
            };
            let value = value.or_else(|| field.default_value().cloned());

            let own = scope.get_child_context(node.id());
            match value {
                Some(value) => {
                    if validate && !accepts(field, &value) {
                        return Err(NodeError::InvalidValue {
                            field: field.key().clone(),
                            expected: field.expectation(),
                            found: value,
                        });
                    }
                    own.put(slot, value);
                }
                None if field.is_optional() => {
                    own.remove(&slot);
                }
                None => return Err(NodeError::MissingInput(field.key().clone())),
            }
        }
        Ok(())
    }

    /// Re-validates the outputs a plain node produced.
    fn check_outputs(&self, node: &Node, path: &[NodeId]) -> Result<(), NodeError> {
        if !self.config.runtime_validation() || node.is_macro() {
            return Ok(());
        }
        let Some(scope) = self.context.find_descendant(path) else {
            return Ok(());
        };
        for field in node.outputs() {
            if let Some(value) = scope.get(&Slot::from(field))
                && !field.accepts_value(value)
            {
                return Err(NodeError::InvalidValue {
                    field: field.key().clone(),
                    expected: field.expectation(),
                    found: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Pops every exhausted macro frame, looping iteration frames first.
    fn unwind(&mut self) {
        while self.frames.len() > 1 && self.fault.is_none() {
            let top = self.frames.len() - 1;
            let frame = &mut self.frames[top];
            if frame.next().is_some() {
                return;
            }
            let Some(owner) = frame.owner.as_mut() else {
                return;
            };
            if let Some(plan) = owner.iteration.as_mut()
                && !plan.is_finished()
            {
                let scope = self.context.descend_mut(&frame.path);
                plan.record(scope);
                plan.advance();
                if !plan.is_finished() {
                    plan.load(scope);
                    frame.cursor = 0;
                    let event = ProcessorEvent::IterationStart {
                        node_id: owner.node.id().clone(),
                        name: owner.node.name().to_owned(),
                        iteration: plan.index(),
                        max_iterations: plan.max(),
                    };
                    self.emit::<OnIterationStart>(&event);
                    continue;
                }
            }
            if let Some(frame) = self.frames.pop() {
                self.finish_frame(frame, self.depth + top);
            }
        }
    }

    /// Writes a finished frame's outputs and completes its macro in the parent.
    fn finish_frame(&mut self, frame: Frame<'g>, depth: usize) {
        let Some(owner) = frame.owner else {
            return;
        };
        let scope = self.context.descend_mut(&frame.path);
        match owner.iteration {
            Some(plan) => plan.finish(scope),
            None => owner.macro_node.store_outputs(scope),
        }
        if let Some(parent) = self.frames.last_mut() {
            parent.cursor += 1;
        }
        self.nodes_executed += 1;

        let node = owner.node;
        let duration = owner.entered_at.elapsed();
        tracing::debug!(node = %node.id(), name = node.name(), depth, "stepped out of macro");
        self.emit::<OnFrameExit>(&ProcessorEvent::FrameExit {
            node_id: node.id().clone(),
            name: node.name().to_owned(),
            depth,
            duration,
        });
        self.emit::<OnNodeComplete>(&ProcessorEvent::NodeComplete {
            node_id: node.id().clone(),
            name: node.name().to_owned(),
            depth: depth - 1,
            duration,
        });
        self.check_breakpoint(node, depth - 1);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State transitions
    // ─────────────────────────────────────────────────────────────────────────

    fn begin_run(&mut self) {
        if self.state != ProcessorState::Idle || self.started_at.is_some() {
            return;
        }
        self.started_at = Some(Instant::now());
        tracing::debug!(
            nodes = self.graph.node_count(),
            depth = self.depth,
            "run starting"
        );
        self.emit::<OnRunStart>(&ProcessorEvent::RunStart {
            node_count: self.graph.node_count(),
            depth: self.depth,
        });
    }

    /// Marks the run complete once nothing remains.
    fn settle(&mut self) {
        if self.fault.is_some() || self.current_node().is_some() {
            return;
        }
        if !matches!(
            self.state,
            ProcessorState::Idle
                | ProcessorState::Running
                | ProcessorState::Halted(HaltReason::Breakpoint(_))
        ) {
            return;
        }
        self.begin_run();
        self.state = ProcessorState::Complete;
        let duration = self
            .started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();
        tracing::debug!(
            nodes_executed = self.nodes_executed,
            ?duration,
            depth = self.depth,
            "run complete"
        );
        self.emit::<OnRunComplete>(&ProcessorEvent::RunComplete {
            nodes_executed: self.nodes_executed,
            duration,
            depth: self.depth,
        });
    }

    fn check_breakpoint(&mut self, node: &Node, depth: usize) {
        if !node.has_breakpoint() || self.config.ignore_breakpoints() {
            return;
        }
        tracing::debug!(node = %node.id(), name = node.name(), depth, "breakpoint");
        self.state = ProcessorState::Halted(HaltReason::Breakpoint(node.id().clone()));
        self.emit::<OnBreakpoint>(&ProcessorEvent::Breakpoint {
            node_id: node.id().clone(),
            name: node.name().to_owned(),
            depth,
        });
    }

    /// Returns `false` after latching [`Fault::NestingLimit`] if entering
    /// `node` would nest too deep.
    fn check_nesting(&mut self, node: &Node, depth: usize) -> bool {
        let limit = self.config.max_nesting_depth();
        if depth < limit {
            return true;
        }
        self.latch(Fault::NestingLimit {
            node: node.id().clone(),
            depth: depth + 1,
            limit,
        });
        false
    }

    fn node_failed(&mut self, node: &Node, depth: usize, error: NodeError) {
        self.emit::<OnNodeError>(&ProcessorEvent::NodeError {
            node_id: node.id().clone(),
            name: node.name().to_owned(),
            depth,
            error: error.to_string(),
        });
        self.latch(Fault::Processing(ProcessingError::new(
            node.id().clone(),
            node.name(),
            error,
        )));
    }

    fn latch_canceled(&mut self, node: &Node) {
        self.latch(Fault::Processing(ProcessingError::new(
            node.id().clone(),
            node.name(),
            NodeError::Canceled,
        )));
    }

    fn latch(&mut self, fault: Fault) {
        if self.depth == 0 {
            tracing::warn!(%fault, "processor fault latched");
        } else {
            tracing::debug!(%fault, depth = self.depth, "nested processor fault latched");
        }
        self.state = if fault.is_canceled() {
            ProcessorState::Halted(HaltReason::Canceled)
        } else {
            ProcessorState::Errored
        };
        self.emit::<OnRunFailure>(&ProcessorEvent::RunFailure {
            fault: fault.clone(),
            depth: self.depth,
        });
        self.fault = Some(fault);
    }

    fn emit<S: Schedule>(&mut self, event: &ProcessorEvent) {
        if let Some(hooks) = &self.hooks {
            hooks.invoke(ScheduleId::of::<S>(), &mut self.runtime, event);
        }
    }

    fn current_rank(&self) -> Option<usize> {
        let frame = self.frames.last()?;
        frame.graph.rank(frame.next()?)
    }
}

impl fmt::Debug for Processor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("state", &self.state)
            .field("fault", &self.fault)
            .field("depth", &self.depth)
            .field("frame_depth", &self.frame_depth())
            .field("current_node", &self.current_node())
            .field("nodes_executed", &self.nodes_executed)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The source value of `link`, read from the frame scope.
fn linked_value(scope: &Context, link: &Link) -> Option<Value> {
    scope
        .find_child_context(link.source())
        .and_then(|source| source.output(link.source_field().as_str()))
        .cloned()
}

/// Dynamic acceptance, element-wise for multi-input ports.
fn accepts(field: &Field, value: &Value) -> bool {
    match value {
        Value::List(items) if field.is_multi() => {
            items.iter().all(|item| field.accepts_value(item))
        }
        _ => field.accepts_value(value),
    }
}
