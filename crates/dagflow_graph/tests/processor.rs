//! Integration tests for the stepping processor.
//!
//! Covers plain stepping, rank-wise stepping, breakpoints, latched faults,
//! cancellation, input gathering, runtime validation, and hook delivery.


use std::sync::Arc;

use dagflow_graph::dev::{DevToolsPlugin, ExecutionRecorder};
use dagflow_graph::graph::Graph;
use dagflow_graph::hooks::HooksAPI;
use dagflow_graph::hooks::schedule::{OnNodeComplete, OnRunComplete, OnRunFailure, OnRunStart};
use dagflow_graph::processor::{HaltReason, Processor, ProcessorConfig, ProcessorState};
use dagflow_system::context::{Context, Slot};
use dagflow_system::error::{Fault, NodeError};
use dagflow_system::field::{Direction, Field};
use dagflow_system::value::{Value, ValueType};
use parking_lot::Mutex;
use test_utils::{
    Add, CancelRun, Constant, Counting, Fail, Sum, add_scenario, counting_chain, output,
};

fn processing_error<'p>(processor: &'p Processor<'_>) -> &'p NodeError {
    match processor.error() {
        Some(Fault::Processing(error)) => &error.error,
        other => panic!("expected a processing fault, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLAIN STEPPING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn add_scenario_produces_five() {
    let scenario = add_scenario(2, 3);
    let mut processor = Processor::new(&scenario.graph);
    processor.reset(Context::new());

    assert_eq!(processor.step_all(), ProcessorState::Complete);
    assert!(!processor.has_next());
    assert!(processor.error().is_none());
    assert_eq!(
        output(processor.context(), &scenario.c, "result"),
        Some(&Value::Int(5))
    );
}

#[test]
fn steps_follow_topological_order() {
    let scenario = add_scenario(2, 3);
    let mut processor = Processor::new(&scenario.graph);
    processor.reset(Context::new());

    assert_eq!(processor.state(), &ProcessorState::Idle);
    assert_eq!(processor.current_node(), Some(&scenario.a));
    assert_eq!(processor.step(), ProcessorState::Running);
    assert_eq!(processor.current_node(), Some(&scenario.b));
    assert_eq!(processor.step(), ProcessorState::Running);
    assert_eq!(processor.current_node(), Some(&scenario.c));
    assert_eq!(processor.step(), ProcessorState::Complete);
    assert_eq!(processor.current_node(), None);
    assert_eq!(processor.nodes_executed(), 3);

    // Stepping a finished run is a no-op.
    assert_eq!(processor.step(), ProcessorState::Complete);
    assert_eq!(processor.nodes_executed(), 3);
}

#[test]
fn step_all_operates_each_node_once() {
    let (graph, _, counter) = counting_chain(7);
    let mut processor = Processor::new(&graph);
    processor.reset(Context::new());

    assert_eq!(processor.step_all(), ProcessorState::Complete);
    assert_eq!(counter.calls(), 7);
    assert_eq!(processor.nodes_executed(), 7);
    assert!(!processor.has_next());
}

#[test]
fn reset_allows_a_second_run() {
    let (graph, _, counter) = counting_chain(3);
    let mut processor = Processor::new(&graph);

    processor.reset(Context::new());
    processor.step_all();
    processor.reset(Context::new());
    assert_eq!(processor.state(), &ProcessorState::Idle);
    assert!(processor.has_next());
    assert_eq!(processor.step_all(), ProcessorState::Complete);
    assert_eq!(counter.calls(), 6);
}

#[test]
fn step_to_next_level_finishes_a_rank() {
    let scenario = add_scenario(2, 3);
    let mut processor = Processor::new(&scenario.graph);
    processor.reset(Context::new());

    assert_eq!(processor.step_to_next_level(), ProcessorState::Running);
    assert_eq!(processor.nodes_executed(), 2);
    assert_eq!(processor.current_node(), Some(&scenario.c));

    assert_eq!(processor.step_to_next_level(), ProcessorState::Complete);
    assert_eq!(processor.nodes_executed(), 3);
}

#[test]
fn context_values_stay_in_their_node_scope() {
    let scenario = add_scenario(2, 3);
    let mut processor = Processor::new(&scenario.graph);
    processor.reset(Context::new());
    processor.step_all();

    let context = processor.context();
    assert!(context.is_empty(), "root holds no port values");
    let c_scope = context.find_child_context(&scenario.c).unwrap();
    assert_eq!(c_scope.output("value"), None);
    assert_eq!(c_scope.input("a"), Some(&Value::Int(2)));
    let b_scope = context.find_child_context(&scenario.b).unwrap();
    assert_eq!(b_scope.output("result"), None);
}

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT GATHERING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn unlinked_required_input_faults() {
    let mut graph = Graph::new();
    let add = graph.add_operation(Add).unwrap();
    let mut processor = Processor::new(&graph);
    processor.reset(Context::new());

    assert_eq!(processor.step(), ProcessorState::Errored);
    assert_eq!(
        processing_error(&processor),
        &NodeError::MissingInput("a".into())
    );
    assert_eq!(processor.current_node(), Some(&add));
}

#[test]
fn seeded_inputs_feed_unlinked_ports() {
    let mut graph = Graph::new();
    let add = graph.add_operation(Add).unwrap();

    let mut context = Context::new();
    let scope = context.get_child_context(&add);
    scope.put(Slot::input("a"), 40);
    scope.put(Slot::input("b"), 2);

    let mut processor = Processor::new(&graph);
    processor.reset(context);
    assert_eq!(processor.step_all(), ProcessorState::Complete);
    assert_eq!(
        output(processor.context(), &add, "result"),
        Some(&Value::Int(42))
    );
}

#[test]
fn defaults_fill_unlinked_ports() {
    let mut graph = Graph::new();
    let add = graph.add_operation(Add).unwrap();
    graph.remove_field(&add, Direction::Input, "b").unwrap();
    graph
        .add_field(&add, Field::input("b", ValueType::Int).with_default(10))
        .unwrap();

    let mut context = Context::new();
    context.get_child_context(&add).put(Slot::input("a"), 1);

    let mut processor = Processor::new(&graph);
    processor.reset(context);
    processor.step_all();
    assert_eq!(
        output(processor.context(), &add, "result"),
        Some(&Value::Int(11))
    );
}

#[test]
fn multi_input_collects_in_link_order() {
    let mut graph = Graph::new();
    let sum = graph.add_operation(Sum).unwrap();
    for value in [4, 5, 6] {
        let constant = graph.add_operation(Constant::int(value)).unwrap();
        graph.connect(&constant, "value", &sum, "values").unwrap();
    }

    let mut processor = Processor::new(&graph);
    processor.reset(Context::new());
    processor.step_all();

    let scope = processor.context().find_child_context(&sum).unwrap();
    assert_eq!(scope.input("values"), Some(&Value::from(vec![4_i64, 5, 6])));
    assert_eq!(scope.output("total"), Some(&Value::Int(15)));
}

#[test]
fn runtime_validation_rejects_seeded_values() {
    let mut graph = Graph::new();
    let add = graph.add_operation(Add).unwrap();
    let seeded = || {
        let mut context = Context::new();
        let scope = context.get_child_context(&add);
        scope.put(Slot::input("a"), "two");
        scope.put(Slot::input("b"), 3);
        context
    };

    let mut processor = Processor::new(&graph);
    processor.reset(seeded());
    processor.step_all();
    assert!(matches!(
        processing_error(&processor),
        NodeError::InvalidValue { field, .. } if field.as_str() == "a"
    ));

    // Without validation the operation sees the value and fails on its own.
    let mut processor =
        Processor::new(&graph).with_config(ProcessorConfig::new().with_runtime_validation(false));
    processor.reset(seeded());
    processor.step_all();
    assert!(matches!(processing_error(&processor), NodeError::Failed(_)));
}

// ═══════════════════════════════════════════════════════════════════════════════
// BREAKPOINTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn breakpoint_halts_after_the_node() {
    let mut scenario = add_scenario(2, 3);
    scenario.graph.set_breakpoint(&scenario.b, true).unwrap();
    let mut processor = Processor::new(&scenario.graph);
    processor.reset(Context::new());

    let state = processor.step_all();
    assert_eq!(
        state,
        ProcessorState::Halted(HaltReason::Breakpoint(scenario.b.clone()))
    );
    assert_eq!(processor.halted_at(), Some(&scenario.b));
    assert!(processor.error().is_none());
    assert!(processor.has_next());
    assert_eq!(processor.nodes_executed(), 2);

    assert_eq!(processor.step_all(), ProcessorState::Complete);
    assert_eq!(
        output(processor.context(), &scenario.c, "result"),
        Some(&Value::Int(5))
    );
}

#[test]
fn breakpoint_on_last_node_completes_on_next_step() {
    let mut scenario = add_scenario(2, 3);
    scenario.graph.set_breakpoint(&scenario.c, true).unwrap();
    let mut processor = Processor::new(&scenario.graph);
    processor.reset(Context::new());

    assert!(processor.step_all().is_halted());
    assert!(!processor.has_next());
    assert_eq!(processor.step(), ProcessorState::Complete);
}

#[test]
fn breakpoints_can_be_ignored() {
    let mut scenario = add_scenario(2, 3);
    scenario.graph.set_breakpoint(&scenario.a, true).unwrap();
    let mut processor = Processor::new(&scenario.graph)
        .with_config(ProcessorConfig::new().with_ignore_breakpoints(true));
    processor.reset(Context::new());

    assert_eq!(processor.step_all(), ProcessorState::Complete);
}

// ═══════════════════════════════════════════════════════════════════════════════
// FAULTS AND CANCELLATION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn failure_is_latched_until_reset() {
    let counter = Counting::new();
    let mut graph = Graph::new();
    let fail = graph.add_operation(Fail).unwrap();
    graph.add_operation(counter.clone()).unwrap();

    let mut processor = Processor::new(&graph);
    processor.reset(Context::new());

    assert_eq!(processor.step_all(), ProcessorState::Errored);
    assert!(!processor.has_next());
    assert_eq!(processor.error().and_then(Fault::node), Some(&fail));
    assert_eq!(processing_error(&processor), &NodeError::failed("boom"));

    // Further stepping does nothing.
    assert_eq!(processor.step(), ProcessorState::Errored);
    assert_eq!(counter.calls(), 0);

    processor.reset(Context::new());
    assert!(processor.error().is_none());
    assert!(processor.has_next());
}

#[test]
fn cancel_before_step_halts() {
    let (graph, _, counter) = counting_chain(2);
    let mut processor = Processor::new(&graph);
    processor.reset(Context::new());

    processor.cancel();
    assert_eq!(
        processor.step(),
        ProcessorState::Halted(HaltReason::Canceled)
    );
    assert!(processor.error().is_some_and(Fault::is_canceled));
    assert!(!processor.has_next());
    assert_eq!(counter.calls(), 0);

    processor.reset(Context::new());
    assert_eq!(processor.step_all(), ProcessorState::Complete);
}

#[test]
fn node_can_cancel_the_rest_of_the_run() {
    let counter = Counting::new();
    let mut graph = Graph::new();
    let cancel = graph.add_operation(CancelRun).unwrap();
    let later = graph.add_operation(counter.clone()).unwrap();

    let mut processor = Processor::new(&graph);
    processor.reset(Context::new());

    assert_eq!(
        processor.step_all(),
        ProcessorState::Halted(HaltReason::Canceled)
    );
    assert_eq!(processor.nodes_executed(), 1);
    assert_eq!(processor.current_node(), Some(&later));
    assert_ne!(processor.current_node(), Some(&cancel));
    assert_eq!(counter.calls(), 0);
}

#[test]
fn cancel_token_is_shared_across_threads() {
    let (graph, _, _) = counting_chain(1);
    let mut processor = Processor::new(&graph);
    processor.reset(Context::new());

    let token = processor.cancel_token().clone();
    std::thread::spawn(move || token.cancel()).join().unwrap();
    assert!(processor.step().is_halted());
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOOKS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn hooks_observe_the_run() {
    let scenario = add_scenario(2, 3);
    let recorder = ExecutionRecorder::new();
    let lifecycle = Arc::new(Mutex::new(Vec::new()));

    let hooks = HooksAPI::new();
    hooks
        .add_plugin(DevToolsPlugin::new().with_recorder(recorder.clone()))
        .unwrap();
    let seen = Arc::clone(&lifecycle);
    hooks
        .register_observer::<(OnRunStart, OnRunComplete, OnRunFailure), _>(
            "lifecycle",
            move |event| seen.lock().push(event.schedule_name()),
        )
        .unwrap();

    let mut processor = Processor::new(&scenario.graph).with_hooks(Arc::new(hooks));
    processor.reset(Context::new());
    processor.step_all();

    assert_eq!(recorder.names(), ["constant", "constant", "add"]);
    assert_eq!(*lifecycle.lock(), ["OnRunStart", "OnRunComplete"]);
}

#[test]
fn failure_hook_sees_the_fault() {
    let mut graph = Graph::new();
    graph.add_operation(Fail).unwrap();
    let failures = Arc::new(Mutex::new(0_usize));

    let hooks = HooksAPI::new();
    let count = Arc::clone(&failures);
    hooks
        .register_observer::<OnRunFailure, _>("failures", move |_| *count.lock() += 1)
        .unwrap();
    let completed = Arc::new(Mutex::new(0_usize));
    let done = Arc::clone(&completed);
    hooks
        .register_observer::<OnNodeComplete, _>("completed", move |_| *done.lock() += 1)
        .unwrap();

    let mut processor = Processor::new(&graph).with_hooks(Arc::new(hooks));
    processor.reset(Context::new());
    processor.step_all();

    assert_eq!(*failures.lock(), 1);
    assert_eq!(*completed.lock(), 0);
}
