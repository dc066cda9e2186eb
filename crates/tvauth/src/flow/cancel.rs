//! Cancellation handle shared between the caller and a running session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

const ACTIVE: u8 = 0;
const CANCELLED: u8 = 1;
const COMPLETED: u8 = 2;

#[derive(Debug)]
struct Latch {
    state: AtomicU8,
    token: CancellationToken,
}

/// Cancels a pending device authorization.
///
/// Cloning is cheap; all clones control the same session. Cancelling twice,
/// or after the session completed, has no effect.
///
/// The session's outcome is decided by a single compare-and-swap: either
/// `cancel` wins and the completion callback never runs, or completion wins
/// and `cancel` becomes a no-op.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    inner: Arc<Latch>,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Latch {
                state: AtomicU8::new(ACTIVE),
                token: CancellationToken::new(),
            }),
        }
    }

    /// Cancels the session if it is still running.
    pub fn cancel(&self) {
        if self
            .inner
            .state
            .compare_exchange(ACTIVE, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::debug!("Device authorization cancelled");
            self.inner.token.cancel();
        }
    }

    /// Returns true if [`cancel`](Self::cancel) took effect.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == CANCELLED
    }

    /// Returns true once the session was cancelled or delivered its outcome.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) != ACTIVE
    }

    /// Claims the right to deliver the outcome. Returns false if the session
    /// was cancelled (or already completed).
    pub(crate) fn try_complete(&self) -> bool {
        self.inner
            .state
            .compare_exchange(ACTIVE, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Resolves when [`cancel`](Self::cancel) takes effect.
    pub(crate) async fn cancelled(&self) {
        self.inner.token.cancelled().await;
    }
}

/// Cancels the session when dropped.
#[derive(Debug)]
pub(crate) struct CancelOnDrop(pub(crate) CancelHandle);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent() {
        let handle = CancelHandle::new();
        assert!(!handle.is_finished());

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(handle.is_finished());
        assert!(!handle.try_complete());
    }

    #[test]
    fn test_cancel_after_complete_is_noop() {
        let handle = CancelHandle::new();
        assert!(handle.try_complete());

        handle.cancel();
        assert!(!handle.is_cancelled());
        assert!(handle.is_finished());
        assert!(!handle.try_complete());
    }

    #[test]
    fn test_clones_share_state() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_drop_guard_cancels() {
        let handle = CancelHandle::new();
        drop(CancelOnDrop(handle.clone()));
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let handle = CancelHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });

        handle.cancel();
        tokio_test::assert_ok!(task.await);
    }

    #[test]
    fn test_race_has_single_winner() {
        for _ in 0..100 {
            let handle = CancelHandle::new();
            let canceller = handle.clone();
            let thread = std::thread::spawn(move || canceller.cancel());
            let completed = handle.try_complete();
            thread.join().unwrap_or_default();

            assert_ne!(completed, handle.is_cancelled());
        }
    }
}
