//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::NodeError;

/// A shared flag requesting that a run stop.
///
/// Clones share the flag, so a token handed to a nested processor observes
/// cancellation of the outer one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not canceled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clears a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with [`NodeError::Canceled`] once cancellation has been requested.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Canceled`] if the token is canceled.
    pub fn check(&self) -> Result<(), NodeError> {
        if self.is_canceled() {
            Err(NodeError::Canceled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(shared.check().is_ok());

        token.cancel();
        assert!(shared.is_canceled());
        assert_eq!(shared.check(), Err(NodeError::Canceled));

        shared.reset();
        assert!(!token.is_canceled());
    }
}
