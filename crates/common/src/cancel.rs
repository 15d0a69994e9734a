//! Cooperative cancellation shared between the orchestrator and workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{CardioError, CardioResult};

/// A cloneable flag that long-running work polls between units of work.
///
/// Clones observe the same flag. Once cancelled, a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of all work observing this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(CardioError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> CardioResult<()> {
        if self.is_cancelled() {
            Err(CardioError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let worker_view = token.clone();
        assert!(worker_view.check().is_ok());

        token.cancel();
        assert!(worker_view.is_cancelled());
        assert!(matches!(worker_view.check(), Err(CardioError::Cancelled)));
    }
}
