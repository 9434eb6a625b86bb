//! The node contract.
//!
//! An [`Operation`] is the behavior behind a node: it declares the ports the
//! node starts with and computes outputs from inputs. The graph layer wraps an
//! operation with identity and metadata; the processor calls
//! [`Operation::operate`] with an [`OperateContext`] scoped to that node.
//!
//! # Example
//!
//! ```
//! use dagflow_system::prelude::*;
//!
//! struct Double;
//!
//! impl Operation for Double {
//!     fn name(&self) -> &str {
//!         "double"
//!     }
//!
//!     fn declare(&self, ports: &mut Ports) -> Result<(), FieldError> {
//!         ports.add(Field::input("x", ValueType::Int))?;
//!         ports.add(Field::output("y", ValueType::Int))?;
//!         Ok(())
//!     }
//!
//!     fn operate(&self, ctx: &mut OperateContext<'_>) -> Result<(), NodeError> {
//!         let x = ctx.input("x")?.as_int().unwrap_or_default();
//!         ctx.set_output("y", x * 2);
//!         Ok(())
//!     }
//! }
//! ```

use downcast_rs::{Downcast, impl_downcast};

use crate::cancel::CancelToken;
use crate::context::{Context, Slot};
use crate::error::NodeError;
use crate::extension::Extensions;
use crate::field::{FieldError, FieldKey, Ports};
use crate::id::NodeId;
use crate::value::Value;

/// Behavior of a node.
///
/// Implementations must be cheap to call repeatedly: the same operation
/// instance runs once per processing run, and once per iteration inside an
/// iteration macro.
pub trait Operation: Downcast + Send + Sync {
    /// Default display name for nodes built from this operation.
    fn name(&self) -> &str;

    /// Grouping used by registries and editors.
    fn category(&self) -> &str {
        "general"
    }

    /// Declares the ports a node starts with.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if the declaration is inconsistent, for example
    /// two ports sharing a key.
    fn declare(&self, ports: &mut Ports) -> Result<(), FieldError> {
        let _ = ports;
        Ok(())
    }

    /// Reads inputs from `ctx` and writes outputs into it.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] for any recoverable failure. The processor
    /// latches it as a fault; it never propagates as a panic.
    fn operate(&self, ctx: &mut OperateContext<'_>) -> Result<(), NodeError>;
}

impl_downcast!(Operation);

/// A type-erased operation.
pub type BoxedOperation = Box<dyn Operation>;

/// The view of the world an operation runs against.
pub struct OperateContext<'a> {
    node: &'a NodeId,
    scope: &'a mut Context,
    runtime: &'a Extensions,
    cancel: &'a CancelToken,
}

impl<'a> OperateContext<'a> {
    /// Creates a context for one call of [`Operation::operate`].
    ///
    /// `scope` is the node's own child context; `runtime` carries services
    /// installed by the processor (for example settings that nested processors
    /// must inherit).
    #[must_use]
    pub fn new(
        node: &'a NodeId,
        scope: &'a mut Context,
        runtime: &'a Extensions,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            node,
            scope,
            runtime,
            cancel,
        }
    }

    /// Returns the ID of the running node.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        self.node
    }

    /// Returns the value of an input port.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::MissingInput`] if nothing was gathered for `key`.
    pub fn input(&self, key: &str) -> Result<&Value, NodeError> {
        self.scope
            .input(key)
            .ok_or_else(|| NodeError::MissingInput(FieldKey::new(key)))
    }

    /// Returns the value of an input port if present.
    #[must_use]
    pub fn try_input(&self, key: &str) -> Option<&Value> {
        self.scope.input(key)
    }

    /// Writes an output value.
    pub fn set_output(&mut self, key: impl Into<FieldKey>, value: impl Into<Value>) {
        self.scope.put(Slot::output(key), value);
    }

    /// Returns the node's own context.
    #[must_use]
    pub fn scope(&self) -> &Context {
        &*self.scope
    }

    /// Returns the node's own context mutably.
    ///
    /// Nodes owning a sub-graph use this to address their children's contexts.
    pub fn scope_mut(&mut self) -> &mut Context {
        &mut *self.scope
    }

    /// Returns the services installed by the processor.
    #[must_use]
    pub fn runtime(&self) -> &Extensions {
        self.runtime
    }

    /// Returns the cancellation token of the current run.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        self.cancel
    }

    /// Fails once cancellation has been requested.
    ///
    /// Long-running operations call this between internal iterations.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Canceled`] if the run was canceled.
    pub fn check_canceled(&self) -> Result<(), NodeError> {
        self.cancel.check()
    }
}
