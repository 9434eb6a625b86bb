//! Macro nodes: nodes that own a sub-graph.
//!
//! A [`MacroNode`] encapsulates an inner [`Graph`] and exposes selected inner
//! ports as its own through *published fields*. Publishing and unpublishing
//! go through [`Graph::publish`] and [`Graph::unpublish`] on the graph that
//! owns the macro node, so that the macro's external links stay consistent.
//!
//! # Execution
//!
//! The macro's own context scope doubles as the root context of its inner
//! graph: inner node contexts are children of the macro's scope. Before an
//! inner run the children are cleared and every published input is copied into
//! its inner node's input slot. After the run every published output is copied
//! back into the macro's output slot.
//!
//! An iteration macro ([`MacroKind::Iteration`]) runs its inner graph once per
//! element of its longest list input. Inputs are snapshotted when the macro
//! starts; each run receives the element at the current index (or nothing, for
//! shorter lists), and each published output collects one entry per run.

use core::mem;

use dagflow_system::cancel::CancelToken;
use dagflow_system::context::{Context, Slot};
use dagflow_system::error::{Fault, ItemMissingError, NodeError};
use dagflow_system::field::{Direction, Field, FieldError, FieldKey, Ports};
use dagflow_system::id::NodeId;
use dagflow_system::operation::{OperateContext, Operation};
use dagflow_system::validator::TypeValidator;
use dagflow_system::value::{Value, ValueType};
use serde::{Deserialize, Serialize};

use crate::graph::{Graph, GraphError};
use crate::hooks::ProcessorEvent;
use crate::hooks::schedule::OnIterationStart;
use crate::processor::{Processor, ProcessorRuntime};

/// How a macro runs its sub-graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MacroKind {
    /// Runs the sub-graph once.
    #[default]
    Single,
    /// Runs the sub-graph once per element of its list inputs.
    Iteration,
}

/// A mapping from a macro port to an inner node's port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublishedField {
    direction: Direction,
    key: FieldKey,
    node: NodeId,
    field: FieldKey,
}

impl PublishedField {
    /// Side of the published port.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Key of the port on the macro node.
    #[must_use]
    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    /// The inner node.
    #[must_use]
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// The inner node's port.
    #[must_use]
    pub fn field(&self) -> &FieldKey {
        &self.field
    }

    fn inner_slot(&self) -> Slot {
        Slot::new(self.direction, self.field.clone())
    }
}

/// An operation that owns and runs a sub-graph.
#[derive(Debug, Default)]
pub struct MacroNode {
    name: String,
    kind: MacroKind,
    graph: Graph,
    published: Vec<PublishedField>,
}

impl MacroNode {
    /// Creates a macro that runs its sub-graph once.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates an iteration macro.
    #[must_use]
    pub fn iteration(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MacroKind::Iteration,
            ..Self::default()
        }
    }

    /// Replaces the sub-graph.
    #[must_use]
    pub fn with_graph(mut self, graph: Graph) -> Self {
        self.graph = graph;
        self
    }

    /// Returns the macro kind.
    #[must_use]
    pub fn kind(&self) -> MacroKind {
        self.kind
    }

    /// Returns `true` for [`MacroKind::Iteration`].
    #[must_use]
    pub fn is_iteration(&self) -> bool {
        self.kind == MacroKind::Iteration
    }

    /// Returns the sub-graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns the sub-graph mutably.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Returns every published mapping, in publish order.
    #[must_use]
    pub fn published(&self) -> &[PublishedField] {
        &self.published
    }

    /// Returns the published mappings on one side.
    pub fn published_in(&self, direction: Direction) -> impl Iterator<Item = &PublishedField> {
        self.published
            .iter()
            .filter(move |mapping| mapping.direction == direction)
    }

    /// Finds the mapping behind a macro port.
    #[must_use]
    pub fn find_published(&self, direction: Direction, key: &str) -> Option<&PublishedField> {
        self.published_in(direction)
            .find(|mapping| mapping.key.as_str() == key)
    }

    /// Returns the macro port key an inner port is published under.
    #[must_use]
    pub fn published_key_for(
        &self,
        direction: Direction,
        node: &NodeId,
        field: &str,
    ) -> Option<&FieldKey> {
        self.published_in(direction)
            .find(|mapping| &mapping.node == node && mapping.field.as_str() == field)
            .map(|mapping| &mapping.key)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Publishing
    // ─────────────────────────────────────────────────────────────────────────

    /// Checks a publish request and builds the macro port and mapping.
    ///
    /// Nothing is mutated; the caller adds the port and then the mapping.
    pub(crate) fn prepare_publish(
        &self,
        macro_id: &NodeId,
        ports: &Ports,
        direction: Direction,
        key: FieldKey,
        inner_node: &NodeId,
        inner_field: &str,
    ) -> Result<(Field, PublishedField), GraphError> {
        let node = self
            .graph
            .node(inner_node)
            .ok_or_else(|| GraphError::NodeNotFound(inner_node.clone()))?;
        let inner = node
            .field(direction, inner_field)
            .ok_or_else(|| GraphError::Field {
                node: inner_node.clone(),
                source: FieldError::NotFound {
                    direction,
                    key: FieldKey::new(inner_field),
                },
            })?;

        if self
            .published_key_for(direction, inner_node, inner_field)
            .is_some()
        {
            return Err(GraphError::AlreadyPublished {
                macro_node: macro_id.clone(),
                node: inner_node.clone(),
                field: inner.key().clone(),
            });
        }
        if direction == Direction::Input
            && !self
                .graph
                .links_at(inner_node, Direction::Input, inner_field)
                .is_empty()
        {
            return Err(GraphError::InnerInputLinked {
                node: inner_node.clone(),
                field: inner.key().clone(),
            });
        }

        let key = disambiguate(ports, direction, key);
        let field = self.external_field(inner, key.clone());
        let mapping = PublishedField {
            direction,
            key,
            node: inner_node.clone(),
            field: inner.key().clone(),
        };
        Ok((field, mapping))
    }

    /// The macro-side port for an inner port.
    fn external_field(&self, inner: &Field, key: FieldKey) -> Field {
        let field = inner.rekeyed(key).with_fixed(false);
        match (self.kind, inner.direction()) {
            (MacroKind::Single, _) => field,
            (MacroKind::Iteration, Direction::Input) => {
                let element = inner
                    .validator()
                    .cloned()
                    .unwrap_or_else(|| TypeValidator::of(inner.value_type().clone()));
                field
                    .retyped(ValueType::list_of(inner.value_type().clone()))
                    .with_validator(TypeValidator::Composite(vec![
                        Some(TypeValidator::collection_of(element.clone())),
                        Some(element),
                    ]))
            }
            (MacroKind::Iteration, Direction::Output) => {
                field.retyped(ValueType::list_of(inner.value_type().clone()))
            }
        }
    }

    pub(crate) fn insert_mapping(&mut self, mapping: PublishedField) {
        self.published.push(mapping);
    }

    /// Drops the mapping behind a macro port, if any.
    pub(crate) fn forget(&mut self, direction: Direction, key: &str) -> Option<PublishedField> {
        let index = self
            .published
            .iter()
            .position(|mapping| mapping.direction == direction && mapping.key.as_str() == key)?;
        Some(self.published.remove(index))
    }

    /// Verifies every mapping still names an existing inner node and port.
    ///
    /// # Errors
    ///
    /// Returns the first dangling mapping as an [`ItemMissingError::PublishedTarget`].
    pub fn check_mappings(&self, macro_id: &NodeId) -> Result<(), ItemMissingError> {
        for mapping in &self.published {
            let exists = self
                .graph
                .node(&mapping.node)
                .is_some_and(|node| node.field(mapping.direction, mapping.field.as_str()).is_some());
            if !exists {
                return Err(ItemMissingError::PublishedTarget {
                    macro_node: macro_id.clone(),
                    direction: mapping.direction,
                    key: mapping.key.clone(),
                    node: mapping.node.clone(),
                    field: mapping.field.clone(),
                });
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope plumbing
    // ─────────────────────────────────────────────────────────────────────────

    /// Clears inner contexts and copies published inputs into them.
    pub(crate) fn load_inputs(&self, scope: &mut Context) {
        scope.clear_children();
        for mapping in self.published_in(Direction::Input) {
            if let Some(value) = scope.input(mapping.key.as_str()).cloned() {
                scope
                    .get_child_context(&mapping.node)
                    .put(mapping.inner_slot(), value);
            }
        }
    }

    /// Copies inner values of published outputs into the macro's output slots.
    pub(crate) fn store_outputs(&self, scope: &mut Context) {
        for mapping in self.published_in(Direction::Output) {
            let value = scope
                .find_child_context(&mapping.node)
                .and_then(|inner| inner.get(&mapping.inner_slot()))
                .cloned();
            match value {
                Some(value) => {
                    scope.put(Slot::output(mapping.key.clone()), value);
                }
                None => {
                    scope.remove(&Slot::output(mapping.key.clone()));
                }
            }
        }
    }

    /// Snapshots the published inputs and plans the iterations of one execution.
    ///
    /// `cap` bounds the number of iterations when set.
    pub(crate) fn plan_iterations(&self, scope: &Context, cap: Option<usize>) -> IterationPlan {
        let inputs: Vec<_> = self
            .published_in(Direction::Input)
            .filter_map(|mapping| {
                let source = match scope.input(mapping.key.as_str())? {
                    Value::List(items) => IterationSource::Each(items.clone()),
                    other => IterationSource::Broadcast(other.clone()),
                };
                Some((mapping.clone(), source))
            })
            .collect();

        let longest = inputs
            .iter()
            .filter_map(|(_, source)| match source {
                IterationSource::Each(items) => Some(items.len()),
                IterationSource::Broadcast(_) => None,
            })
            .max()
            .unwrap_or(0);
        let max = cap.map_or(longest, |cap| longest.min(cap));

        let outputs = self
            .published_in(Direction::Output)
            .map(|mapping| (mapping.clone(), Vec::with_capacity(max)))
            .collect();

        IterationPlan {
            inputs,
            outputs,
            max,
            index: 0,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Atomic execution
    // ─────────────────────────────────────────────────────────────────────────

    fn run_once(
        &self,
        scope: &mut Context,
        runtime: &ProcessorRuntime,
        cancel: &CancelToken,
    ) -> Result<(), NodeError> {
        let mut processor = Processor::nested(&self.graph, runtime, cancel.clone());
        processor.reset(mem::take(scope));
        processor.step_all();
        let fault = processor.error().cloned();
        *scope = processor.into_context();
        match fault {
            Some(fault) => Err(NodeError::Subgraph(Box::new(fault))),
            None => Ok(()),
        }
    }

    fn run_iterations(
        &self,
        node: &NodeId,
        scope: &mut Context,
        runtime: &ProcessorRuntime,
        cancel: &CancelToken,
    ) -> Result<(), NodeError> {
        let mut plan = self.plan_iterations(scope, runtime.config().max_iterations());
        tracing::debug!(node = %node, iterations = plan.max(), "iteration macro starting");
        scope.clear_children();

        while !plan.is_finished() {
            cancel.check()?;
            runtime.emit::<OnIterationStart>(&ProcessorEvent::IterationStart {
                node_id: node.clone(),
                name: self.name.clone(),
                iteration: plan.index(),
                max_iterations: plan.max(),
            });
            plan.load(scope);
            self.run_once(scope, runtime, cancel)?;
            plan.record(scope);
            plan.advance();
        }
        plan.finish(scope);
        Ok(())
    }
}

impl Operation for MacroNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        "macro"
    }

    fn operate(&self, ctx: &mut OperateContext<'_>) -> Result<(), NodeError> {
        let node = ctx.node_id().clone();
        self.check_mappings(&node)
            .map_err(|missing| NodeError::Subgraph(Box::new(Fault::from(missing))))?;

        let runtime = ctx
            .runtime()
            .get::<ProcessorRuntime>()
            .cloned()
            .unwrap_or_default()
            .nested();
        let cancel = ctx.cancel_token().clone();

        let mut scope = mem::take(ctx.scope_mut());
        let result = match self.kind {
            MacroKind::Single => {
                self.load_inputs(&mut scope);
                let result = self.run_once(&mut scope, &runtime, &cancel);
                if result.is_ok() {
                    self.store_outputs(&mut scope);
                }
                result
            }
            MacroKind::Iteration => self.run_iterations(&node, &mut scope, &runtime, &cancel),
        };
        *ctx.scope_mut() = scope;
        result
    }
}

/// Appends `_2`, `_3`, ... to `key` until it is free on `direction`.
fn disambiguate(ports: &Ports, direction: Direction, key: FieldKey) -> FieldKey {
    if !ports.contains(direction, key.as_str()) {
        return key;
    }
    let mut suffix = 2_usize;
    loop {
        let candidate = FieldKey::new(format!("{key}_{suffix}"));
        if !ports.contains(direction, candidate.as_str()) {
            return candidate;
        }
        suffix += 1;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IterationPlan
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum IterationSource {
    Each(Vec<Value>),
    Broadcast(Value),
}

/// The snapshotted inputs and accumulated outputs of one iteration macro
/// execution.
#[derive(Debug, Clone)]
pub(crate) struct IterationPlan {
    inputs: Vec<(PublishedField, IterationSource)>,
    outputs: Vec<(PublishedField, Vec<Value>)>,
    max: usize,
    index: usize,
}

impl IterationPlan {
    pub(crate) fn max(&self) -> usize {
        self.max
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.index >= self.max
    }

    /// Clears inner contexts and seeds the current iteration's elements.
    ///
    /// A list shorter than the current index contributes nothing, and so does
    /// a `Null` element.
    pub(crate) fn load(&self, scope: &mut Context) {
        scope.clear_children();
        for (mapping, source) in &self.inputs {
            let value = match source {
                IterationSource::Each(items) => items.get(self.index).filter(|v| !v.is_null()),
                IterationSource::Broadcast(value) => Some(value),
            };
            if let Some(value) = value {
                scope
                    .get_child_context(&mapping.node)
                    .put(mapping.inner_slot(), value.clone());
            }
        }
    }

    /// Appends this iteration's inner outputs, `Null` where nothing was produced.
    pub(crate) fn record(&mut self, scope: &Context) {
        for (mapping, values) in &mut self.outputs {
            let value = scope
                .find_child_context(&mapping.node)
                .and_then(|inner| inner.get(&mapping.inner_slot()))
                .cloned()
                .unwrap_or(Value::Null);
            values.push(value);
        }
    }

    pub(crate) fn advance(&mut self) {
        self.index += 1;
    }

    /// Writes the collected lists into the macro's output slots.
    pub(crate) fn finish(self, scope: &mut Context) {
        for (mapping, values) in self.outputs {
            scope.put(Slot::output(mapping.key), Value::List(values));
        }
    }
}
