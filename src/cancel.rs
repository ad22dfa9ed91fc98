//! Caller-initiated cancellation.
//!
//! Process discovery and credential resolution can wait for tens of seconds;
//! a [`CancelToken`] lets the caller unblock those waits immediately instead
//! of riding out the full timeout.
//!
//! # Example
//!
//! ```no_run
//! use lcu_connector::{CancelToken, LeagueClient};
//!
//! # async fn example() -> lcu_connector::Result<()> {
//! let (handle, token) = CancelToken::new();
//!
//! tokio::spawn(async move {
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     handle.cancel();
//! });
//!
//! let client = LeagueClient::builder().connect_with_cancel(token).await?;
//! # Ok(())
//! # }
//! ```

use tokio::sync::watch;
use tracing::debug;

// ============================================================================
// CancelHandle
// ============================================================================

/// Sending side of a cancellation pair.
///
/// Dropping the handle without calling [`cancel`](Self::cancel) never
/// cancels the token; pending waits continue to their own timeouts.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancels all tokens paired with this handle.
    ///
    /// Idempotent; later calls have no effect.
    pub fn cancel(&self) {
        debug!("cancellation requested");
        let _ = self.tx.send(true);
    }
}

// ============================================================================
// CancelToken
// ============================================================================

/// Receiving side of a cancellation pair.
///
/// Cheap to clone; all clones observe the same [`CancelHandle`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Creates a new handle/token pair.
    #[must_use]
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// Returns `true` if the paired handle has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the paired handle is cancelled.
    ///
    /// If the handle is dropped without cancelling, this future never
    /// resolves, so callers can `select!` it against their own timeout
    /// without special-casing a dropped handle.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();

        loop {
            if *rx.borrow_and_update() {
                return;
            }

            if rx.changed().await.is_err() {
                // Handle dropped uncancelled: never resolve.
                std::future::pending::<()>().await;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::time::timeout;

    #[tokio::test]
    async fn test_cancel_resolves_waiters() {
        let (handle, token) = CancelToken::new();

        let waiter = tokio::spawn(async move { token.cancelled().await });
        handle.cancel();

        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve after cancel")
            .expect("waiter task should not panic");
    }

    #[tokio::test]
    async fn test_cancel_before_wait_resolves_immediately() {
        let (handle, token) = CancelToken::new();
        handle.cancel();

        assert!(token.is_cancelled());
        timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("already-cancelled token should resolve immediately");
    }

    #[tokio::test]
    async fn test_dropped_handle_never_resolves() {
        let (handle, token) = CancelToken::new();
        drop(handle);

        assert!(!token.is_cancelled());
        let result = timeout(Duration::from_millis(100), token.cancelled()).await;
        assert!(result.is_err(), "dropped handle must not cancel the token");
    }

    #[tokio::test]
    async fn test_clones_share_cancellation() {
        let (handle, token) = CancelToken::new();
        let clone = token.clone();

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }
}
