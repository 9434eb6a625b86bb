//! Schedule markers for processor lifecycle events.
//!
//! These marker types identify when hooks are invoked while a
//! [`Processor`](crate::processor::Processor) steps. Use them with
//! [`ScheduleId::of::<T>()`](dagflow_system::schedule::ScheduleId::of) or with
//! [`register_observer::<OnNodeStart, _>`](super::HooksAPI::register_observer).
//!
//! Event data is provided via the unified
//! [`ProcessorEvent`](super::events::ProcessorEvent) enum, which all hooks receive.

use dagflow_system::schedule::Schedule;

// ─────────────────────────────────────────────────────────────────────────────
// Run Schedules
// ─────────────────────────────────────────────────────────────────────────────

/// Called when a processor executes its first node after a reset.
///
/// Event data: [`ProcessorEvent::RunStart`](super::events::ProcessorEvent::RunStart)
pub struct OnRunStart;
impl Schedule for OnRunStart {}

/// Called when a processor exhausts its topological order.
///
/// Event data: [`ProcessorEvent::RunComplete`](super::events::ProcessorEvent::RunComplete)
pub struct OnRunComplete;
impl Schedule for OnRunComplete {}

/// Called when a processor latches a fault.
///
/// Event data: [`ProcessorEvent::RunFailure`](super::events::ProcessorEvent::RunFailure)
pub struct OnRunFailure;
impl Schedule for OnRunFailure {}

// ─────────────────────────────────────────────────────────────────────────────
// Node Schedules
// ─────────────────────────────────────────────────────────────────────────────

/// Called after a node's inputs are gathered and before it operates.
///
/// Extensions provided by hooks on this schedule are visible to the operation
/// through [`OperateContext::runtime`](dagflow_system::operation::OperateContext::runtime).
///
/// Event data: [`ProcessorEvent::NodeStart`](super::events::ProcessorEvent::NodeStart)
pub struct OnNodeStart;
impl Schedule for OnNodeStart {}

/// Called after a node operates successfully.
///
/// Event data: [`ProcessorEvent::NodeComplete`](super::events::ProcessorEvent::NodeComplete)
pub struct OnNodeComplete;
impl Schedule for OnNodeComplete {}

/// Called when a node fails, including input gathering failures.
///
/// Event data: [`ProcessorEvent::NodeError`](super::events::ProcessorEvent::NodeError)
pub struct OnNodeError;
impl Schedule for OnNodeError {}

/// Called when the processor halts after a node with its breakpoint set.
///
/// Event data: [`ProcessorEvent::Breakpoint`](super::events::ProcessorEvent::Breakpoint)
pub struct OnBreakpoint;
impl Schedule for OnBreakpoint {}

// ─────────────────────────────────────────────────────────────────────────────
// Macro Schedules
// ─────────────────────────────────────────────────────────────────────────────

/// Called when stepping enters a macro's sub-graph.
///
/// Event data: [`ProcessorEvent::FrameEnter`](super::events::ProcessorEvent::FrameEnter)
pub struct OnFrameEnter;
impl Schedule for OnFrameEnter {}

/// Called when a stepped macro frame finishes and control returns to its parent.
///
/// Event data: [`ProcessorEvent::FrameExit`](super::events::ProcessorEvent::FrameExit)
pub struct OnFrameExit;
impl Schedule for OnFrameExit {}

/// Called before each run of an iteration macro's sub-graph.
///
/// Event data: [`ProcessorEvent::IterationStart`](super::events::ProcessorEvent::IterationStart)
pub struct OnIterationStart;
impl Schedule for OnIterationStart {}

#[cfg(test)]
mod tests {
    use super::*;
    use dagflow_system::schedule::ScheduleId;

    #[test]
    fn schedule_ids_are_distinct() {
        let ids = [
            ScheduleId::of::<OnRunStart>(),
            ScheduleId::of::<OnRunComplete>(),
            ScheduleId::of::<OnRunFailure>(),
            ScheduleId::of::<OnNodeStart>(),
            ScheduleId::of::<OnNodeComplete>(),
            ScheduleId::of::<OnNodeError>(),
            ScheduleId::of::<OnBreakpoint>(),
            ScheduleId::of::<OnFrameEnter>(),
            ScheduleId::of::<OnFrameExit>(),
            ScheduleId::of::<OnIterationStart>(),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn short_name_strips_module_path() {
        assert_eq!(ScheduleId::of::<OnBreakpoint>().short_name(), "OnBreakpoint");
    }
}
