//! Core infrastructure plugins for dagflow.
//!
//! - [`TracingPlugin`] - Logging and observability via the `tracing` crate
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use dagflow_core_plugins::{TracingFormat, TracingPlugin};
//! use dagflow_graph::graph::Graph;
//! use dagflow_graph::hooks::HooksAPI;
//! use dagflow_graph::processor::{Processor, ProcessorState};
//! use dagflow_system::context::Context;
//! use tracing::Level;
//!
//! let hooks = HooksAPI::new();
//! hooks
//!     .add_plugin(
//!         TracingPlugin::new()
//!             .with_level(Level::DEBUG)
//!             .with_format(TracingFormat::Compact),
//!     )
//!     .unwrap();
//!
//! let graph = Graph::new();
//! let mut processor = Processor::new(&graph).with_hooks(Arc::new(hooks));
//! processor.reset(Context::new());
//! assert_eq!(processor.step_all(), ProcessorState::Complete);
//! ```
//!
//! # Architecture
//!
//! This crate is part of Layer 3:
//!
//! - **Layer 1** (`dagflow_system`): values, ports, contexts, and the node contract
//! - **Layer 2** (`dagflow_graph`): graphs, macros, and the stepping processor
//! - **Layer 3** (plugins): infrastructure hooked into the processor

mod tracing_plugin;

pub use tracing_plugin::{TracingConfig, TracingFormat, TracingPlugin};
