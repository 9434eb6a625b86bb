//! # dagflow Internal Library
//!
//! Re-exports the core dagflow crates for convenience.

/// Layer 1: values, ports, contexts, and the node contract.
pub use dagflow_system;

/// Layer 2: graphs, links, macros, and the stepping processor.
pub use dagflow_graph;

/// Layer 3: infrastructure plugins.
pub use dagflow_core_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use dagflow_core_plugins::{TracingFormat, TracingPlugin};
    pub use dagflow_graph::prelude::*;
    pub use dagflow_system::prelude::*;
}
