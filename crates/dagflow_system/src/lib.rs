//! The foundational primitives of dagflow (Layer 1).
//!
//! `dagflow_system` defines everything a node needs to know about, without
//! knowing about graphs:
//!
//! - [`value`] - Runtime values and declared types
//! - [`validator`] - Static and dynamic acceptance rules for input ports
//! - [`field`] - Ports and per-node port sets
//! - [`context`] - Hierarchical execution contexts
//! - [`operation`] - The node contract and the context an operation runs against
//! - [`cancel`] - Cooperative cancellation
//! - [`error`] - Processing, item-missing, and fault types
//! - [`extension`] - Typed side tables for nodes and graphs
//! - [`registry`] - Node type registry
//! - [`schedule`] - Schedule identifiers for lifecycle hooks
//!
//! # Architecture
//!
//! - **Layer 1** (`dagflow_system`): node-level primitives (this crate)
//! - **Layer 2** (`dagflow_graph`): graphs, macros, and the stepping processor
//! - **Layer 3** (plugins): tracing and other infrastructure

/// Cooperative cancellation.
pub mod cancel;

/// Hierarchical execution contexts.
pub mod context;

/// Runtime error taxonomy.
pub mod error;

/// Typed side tables.
pub mod extension;

/// Ports and port sets.
pub mod field;

/// Node identifiers.
pub mod id;

/// The node contract.
pub mod operation;

/// Node type registry.
pub mod registry;

/// Schedule identifiers.
pub mod schedule;

/// Acceptance rules for input ports.
pub mod validator;

/// Runtime values and declared types.
pub mod value;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::context::{Context, Slot};
    pub use crate::error::{Fault, ItemMissingError, NodeError, ProcessingError};
    pub use crate::extension::{Extension, ExtensionId, Extensions};
    pub use crate::field::{Direction, Field, FieldError, FieldKey, Ports};
    pub use crate::id::NodeId;
    pub use crate::operation::{BoxedOperation, OperateContext, Operation};
    pub use crate::registry::{NodeRegistry, RegistryEntry, RegistryError};
    pub use crate::schedule::{IntoScheduleIds, Schedule, ScheduleId};
    pub use crate::validator::TypeValidator;
    pub use crate::value::{Value, ValueType};
}
