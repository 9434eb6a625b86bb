//! Plugins: named bundles of hook registrations.

use crate::hooks::{HookRegistrationError, HooksAPI};

/// A named bundle of hooks added through [`HooksAPI::add_plugin`].
///
/// # Example
///
/// ```
/// use dagflow_graph::hooks::{HookRegistrationError, HooksAPI, ProcessorEvent};
/// use dagflow_graph::hooks::schedule::OnRunFailure;
/// use dagflow_graph::plugin::Plugin;
///
/// struct FailureLog;
///
/// impl Plugin for FailureLog {
///     fn build(&self, hooks: &HooksAPI) -> Result<(), HookRegistrationError> {
///         hooks.register_observer::<OnRunFailure, _>("failure-log", |event: &ProcessorEvent| {
///             eprintln!("{event}");
///         })?;
///         Ok(())
///     }
/// }
///
/// let hooks = HooksAPI::new();
/// hooks.add_plugin(FailureLog).unwrap();
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Registers the plugin's hooks.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError`] if a hook name is already taken.
    fn build(&self, hooks: &HooksAPI) -> Result<(), HookRegistrationError>;

    /// Returns the plugin's name, used in logs.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }
}
