//! Cancellation token for I/O-boundary operations.
//!
//! Every exported function that touches the network or the KV store takes a
//! [`CancellationToken`] and checks it before and after each blocking call.
//! Pure in-memory operations (`Match`, trie `Add`, key build) take none.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};

/// A cooperative cancellation flag, cheap to clone and share across tasks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(GatewayError::Cancelled)` if the token has been
    /// cancelled, otherwise `Ok(())`. Call at entry and after every blocking
    /// call a cancellable operation makes.
    pub fn check(&self) -> GatewayResult<()> {
        if self.is_cancelled() {
            Err(GatewayError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancel_is_observed_by_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.check().is_err());
    }
}
