//! Lifecycle hooks for processor execution.
//!
//! Plugins extend the [`Processor`](crate::processor::Processor) with
//! callbacks fired as it steps. Hooks execute in registration order.
//!
//! - **Schedule markers** ([`schedule`]): empty types that identify hook points
//! - **Events** ([`events`]): the [`ProcessorEvent`] enum carrying context to hooks
//! - **API** ([`api`]): registration and invocation
//!
//! # Example
//!
//! ```
//! use dagflow_graph::hooks::HooksAPI;
//! use dagflow_graph::hooks::events::ProcessorEvent;
//! use dagflow_graph::hooks::schedule::OnBreakpoint;
//!
//! let hooks = HooksAPI::new();
//! hooks
//!     .register_observer::<OnBreakpoint, _>("pause-log", |event: &ProcessorEvent| {
//!         if let ProcessorEvent::Breakpoint { name, .. } = event {
//!             println!("paused after {name}");
//!         }
//!     })
//!     .unwrap();
//! ```

pub mod api;
pub mod events;
pub mod schedule;

pub use api::{BoxedHook, HookRegistrationError, HooksAPI};
pub use events::ProcessorEvent;
