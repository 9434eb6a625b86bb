//! Schedule identifiers for processor lifecycle hooks.
//!
//! A schedule is identified by a marker type wrapped in a [`ScheduleId`].
//! The graph layer defines the markers (`OnNodeStart`, `OnBreakpoint`, ...)
//! and invokes the hooks registered against them while it steps.

use core::any::TypeId;
use variadics_please::all_tuples;

/// Identifier for a schedule, derived from a marker type.
///
/// # Example
///
/// ```
/// # use dagflow_system::schedule::ScheduleId;
/// pub struct AfterWave;
///
/// let schedule = ScheduleId::of::<AfterWave>();
/// assert!(schedule.type_name().ends_with("AfterWave"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ScheduleId {
    /// Creates a `ScheduleId` for the given marker type.
    #[must_use]
    pub fn of<S: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: core::any::type_name::<S>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name without its module path.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(self.type_name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schedule Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Marker trait for schedule types.
pub trait Schedule: 'static {}

// ─────────────────────────────────────────────────────────────────────────────
// IntoScheduleIds Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Types that can be converted into a list of schedule IDs.
///
/// Implemented for single schedules and tuples of schedules, so a hook can be
/// registered on several schedules at once.
pub trait IntoScheduleIds {
    /// Returns the schedule IDs for this type.
    fn schedule_ids() -> Vec<ScheduleId>;
}

impl<S: Schedule> IntoScheduleIds for S {
    fn schedule_ids() -> Vec<ScheduleId> {
        vec![ScheduleId::of::<S>()]
    }
}

macro_rules! impl_into_schedule_ids_for_tuple {
    ($($S:ident),*) => {
        impl<$($S: Schedule),*> IntoScheduleIds for ($($S,)*) {
            fn schedule_ids() -> Vec<ScheduleId> {
                vec![$(ScheduleId::of::<$S>()),*]
            }
        }
    };
}

all_tuples!(impl_into_schedule_ids_for_tuple, 2, 16, S);

#[cfg(test)]
mod tests {
    use super::*;

    struct First;
    impl Schedule for First {}

    struct Second;
    impl Schedule for Second {}

    #[test]
    fn ids_compare_by_type() {
        assert_eq!(ScheduleId::of::<First>(), ScheduleId::of::<First>());
        assert_ne!(ScheduleId::of::<First>(), ScheduleId::of::<Second>());
        assert_eq!(ScheduleId::of::<First>().type_id(), TypeId::of::<First>());
    }

    #[test]
    fn short_name_strips_path() {
        assert_eq!(ScheduleId::of::<Second>().short_name(), "Second");
    }

    #[test]
    fn tuples_expand_in_order() {
        let ids = <(Second, First)>::schedule_ids();
        assert_eq!(ids, vec![ScheduleId::of::<Second>(), ScheduleId::of::<First>()]);
        assert_eq!(First::schedule_ids().len(), 1);
    }
}
