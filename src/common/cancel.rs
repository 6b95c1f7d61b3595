//! Cooperative cancellation for long-running planning loops

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::error::{RoutingError, RoutingResult};

/// Shared flag polled between batches, permutations and greedy steps.
///
/// Clones share the same flag, so a UI thread can keep one and hand the
/// other to the planner.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> RoutingResult<()> {
        if self.is_cancelled() {
            Err(RoutingError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Poll an optional token.
pub(crate) fn check_cancelled(token: Option<&CancellationToken>) -> RoutingResult<()> {
    match token {
        Some(token) => token.check(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(token.check().is_ok());
        handle.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(RoutingError::Cancelled));
    }

    #[test]
    fn test_missing_token_never_cancels() {
        assert!(check_cancelled(None).is_ok());
    }
}
