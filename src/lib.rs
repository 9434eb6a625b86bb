//! A dataflow graph engine with typed ports, nested macro graphs, and
//! debugger-style stepping.
//!

pub use dagflow_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use dagflow_internal::prelude::*;
}
