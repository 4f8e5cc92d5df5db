//! Cooperative cancellation.
//!
//! Both import paths poll a [`CancellationToken`] between rows; the record pre-pass also polls
//! it between structural tokens. A cancelled call returns [`IngestionError::Cancelled`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{IngestionError, IngestionResult};

/// Cooperative cancellation signal shared between a caller and an ingestion call.
///
/// Clones share the same flag. Ingestion polls it once before each row (and, for the record
/// pre-pass, before each structural token), so a single expensive row is never interrupted
/// mid-way.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once [`Self::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Fail with [`IngestionError::Cancelled`] if `token` is set and cancelled.
pub(crate) fn checkpoint(token: Option<&CancellationToken>) -> IngestionResult<()> {
    match token {
        Some(t) if t.is_cancelled() => Err(IngestionError::Cancelled),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(checkpoint(Some(&token)).is_ok());
        other.cancel();
        assert!(token.is_cancelled());
        assert!(checkpoint(Some(&token)).unwrap_err().is_cancelled());
        assert!(checkpoint(None).is_ok());
    }
}
