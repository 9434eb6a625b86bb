//! Hook registration API for processor execution.
//!
//! The [`HooksAPI`] is a registry of lifecycle hooks invoked while a
//! [`Processor`](crate::processor::Processor) steps. Share one registry
//! between processors with [`Processor::with_hooks`](crate::processor::Processor::with_hooks);
//! nested macro processors inherit it.
//!
//! # Observer vs Provider Pattern
//!
//! - **Observers** ([`register_observer`](HooksAPI::register_observer)): React to events
//!   without providing anything. Use for logging, recording, tracing.
//! - **Providers** ([`register_provider`](HooksAPI::register_provider)): Produce an
//!   extension that is inserted into the processor's runtime bag, where
//!   operations read it through
//!   [`OperateContext::runtime`](dagflow_system::operation::OperateContext::runtime).
//!
//! # Multi-Schedule Registration
//!
//! ```
//! use dagflow_graph::hooks::HooksAPI;
//! use dagflow_graph::hooks::events::ProcessorEvent;
//! use dagflow_graph::hooks::schedule::{OnNodeComplete, OnNodeError, OnNodeStart};
//!
//! let hooks = HooksAPI::new();
//! hooks
//!     .register_observer::<(OnNodeStart, OnNodeComplete, OnNodeError), _>(
//!         "tracker",
//!         |event: &ProcessorEvent| match event {
//!             ProcessorEvent::NodeStart { name, .. } => println!("start: {name}"),
//!             ProcessorEvent::NodeComplete { duration, .. } => println!("done: {duration:?}"),
//!             ProcessorEvent::NodeError { error, .. } => println!("error: {error}"),
//!             _ => {}
//!         },
//!     )
//!     .unwrap();
//! ```

use core::fmt;
use std::sync::Arc;

use dagflow_system::extension::{Extension, ExtensionId, Extensions};
use dagflow_system::schedule::{IntoScheduleIds, ScheduleId};
use hashbrown::HashMap;
use parking_lot::RwLock;

use super::events::ProcessorEvent;
use crate::plugin::Plugin;

// ─────────────────────────────────────────────────────────────────────────────
// BoxedHook
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased hook receiving the runtime bag and the event.
///
/// Most users should use [`HooksAPI::register_observer`] or
/// [`HooksAPI::register_provider`] instead of creating `BoxedHook` directly.
pub struct BoxedHook {
    handler: Box<dyn Fn(&mut Extensions, &ProcessorEvent) + Send + Sync>,
    provided: Vec<ExtensionId>,
}

impl BoxedHook {
    /// Creates a hook with the given handler and provided extension types.
    #[must_use]
    pub fn new(
        handler: impl Fn(&mut Extensions, &ProcessorEvent) + Send + Sync + 'static,
        provided: Vec<ExtensionId>,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            provided,
        }
    }

    /// Invokes the hook.
    pub fn invoke(&self, runtime: &mut Extensions, event: &ProcessorEvent) {
        (self.handler)(runtime, event);
    }

    /// Returns the extension types this hook provides. Empty for observers.
    #[must_use]
    pub fn provided(&self) -> &[ExtensionId] {
        &self.provided
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookRegistrationError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during hook registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookRegistrationError {
    /// A hook with this name already exists on the schedule.
    DuplicateName {
        /// The schedule where the duplicate was found.
        schedule: ScheduleId,
        /// The duplicate hook name.
        name: String,
    },
}

impl fmt::Display for HookRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookRegistrationError::DuplicateName { schedule, name } => write!(
                f,
                "hook '{}' already registered for schedule '{}'",
                name,
                schedule.short_name()
            ),
        }
    }
}

impl core::error::Error for HookRegistrationError {}

// ─────────────────────────────────────────────────────────────────────────────
// HooksAPI
// ─────────────────────────────────────────────────────────────────────────────

struct HookEntry {
    name: String,
    hook: BoxedHook,
}

/// Registry of processor lifecycle hooks, organized by schedule.
///
/// # Thread Safety
///
/// Uses interior mutability via [`RwLock`], so a shared `Arc<HooksAPI>` can
/// gain registrations while processors hold it.
#[derive(Default)]
pub struct HooksAPI {
    hooks: RwLock<HashMap<ScheduleId, Vec<HookEntry>>>,
}

impl HooksAPI {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer hook for one or more schedules.
    ///
    /// When `S` is a tuple the hook is registered once per schedule under the
    /// name `"{name}@{Schedule}"`.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if the name is taken on
    /// one of the schedules. Registrations on earlier schedules of the tuple
    /// are kept.
    pub fn register_observer<S, F>(
        &self,
        name: impl Into<String>,
        hook: F,
    ) -> Result<&Self, HookRegistrationError>
    where
        S: IntoScheduleIds,
        F: Fn(&ProcessorEvent) + Send + Sync + 'static,
    {
        let schedules = S::schedule_ids();
        let name = name.into();
        let hook = Arc::new(hook);

        for schedule in &schedules {
            let hook = Arc::clone(&hook);
            self.register_boxed(
                *schedule,
                Self::hook_name(&name, *schedule, schedules.len()),
                BoxedHook::new(move |_runtime, event| hook(event), Vec::new()),
            )?;
        }
        Ok(self)
    }

    /// Registers a provider hook for one or more schedules.
    ///
    /// Whatever the hook returns is inserted into the processor's runtime bag,
    /// replacing any previous value of that type. With several providers of
    /// the same type, the last one registered wins.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if the name is taken.
    pub fn register_provider<S, T, F>(
        &self,
        name: impl Into<String>,
        hook: F,
    ) -> Result<&Self, HookRegistrationError>
    where
        S: IntoScheduleIds,
        T: Extension,
        F: Fn(&ProcessorEvent) -> Option<T> + Send + Sync + 'static,
    {
        let schedules = S::schedule_ids();
        let name = name.into();
        let hook = Arc::new(hook);

        for schedule in &schedules {
            let hook = Arc::clone(&hook);
            self.register_boxed(
                *schedule,
                Self::hook_name(&name, *schedule, schedules.len()),
                BoxedHook::new(
                    move |runtime, event| {
                        if let Some(value) = hook(event) {
                            runtime.insert(value);
                        }
                    },
                    vec![ExtensionId::of::<T>()],
                ),
            )?;
        }
        Ok(self)
    }

    /// Registers a pre-built [`BoxedHook`] for the given schedule.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if the name is taken.
    pub fn register_boxed(
        &self,
        schedule: ScheduleId,
        name: impl Into<String>,
        hook: BoxedHook,
    ) -> Result<(), HookRegistrationError> {
        let name = name.into();
        let mut hooks = self.hooks.write();
        let entries = hooks.entry(schedule).or_default();

        if entries.iter().any(|entry| entry.name == name) {
            return Err(HookRegistrationError::DuplicateName { schedule, name });
        }

        entries.push(HookEntry { name, hook });
        Ok(())
    }

    /// Lets a plugin register its hooks.
    ///
    /// # Errors
    ///
    /// Propagates the plugin's registration errors.
    pub fn add_plugin<P: Plugin>(&self, plugin: P) -> Result<&Self, HookRegistrationError> {
        tracing::debug!(plugin = plugin.name(), "adding plugin");
        plugin.build(self)?;
        Ok(self)
    }

    /// Invokes every hook registered for `schedule`, in registration order.
    pub fn invoke(&self, schedule: ScheduleId, runtime: &mut Extensions, event: &ProcessorEvent) {
        let hooks = self.hooks.read();
        if let Some(entries) = hooks.get(&schedule) {
            for entry in entries {
                entry.hook.invoke(runtime, event);
            }
        }
    }

    /// Returns the number of hooks registered for `schedule`.
    #[must_use]
    pub fn hook_count(&self, schedule: ScheduleId) -> usize {
        self.hooks.read().get(&schedule).map_or(0, Vec::len)
    }

    /// Returns the extension types provided by hooks on `schedule`.
    #[must_use]
    pub fn provided_for(&self, schedule: ScheduleId) -> Vec<ExtensionId> {
        self.hooks
            .read()
            .get(&schedule)
            .map(|entries| {
                entries
                    .iter()
                    .flat_map(|entry| entry.hook.provided().iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Checks if a hook with the given name exists on the schedule.
    #[must_use]
    pub fn contains_hook(&self, schedule: ScheduleId, name: &str) -> bool {
        self.hooks
            .read()
            .get(&schedule)
            .is_some_and(|entries| entries.iter().any(|entry| entry.name == name))
    }

    fn hook_name(name: &str, schedule: ScheduleId, schedule_count: usize) -> String {
        if schedule_count > 1 {
            format!("{}@{}", name, schedule.short_name())
        } else {
            name.to_owned()
        }
    }
}

impl fmt::Debug for HooksAPI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read();
        let mut map = f.debug_map();
        for (schedule, entries) in hooks.iter() {
            let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
            map.entry(&schedule.short_name(), &names);
        }
        map.finish()
    }
}
