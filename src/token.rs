//! Serialization token: mutual exclusion with a deadline and cancellation.
//!
//! One token guards all rule-engine invocations within a test, so only one
//! check proceeds at a time. Acquisition past the deadline fails with
//! `Error::LockTimeout`; cancelling the token (test teardown) rejects every
//! waiter with `Error::LockCancelled` so pending checks from a finished
//! test never report against the next test's document.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, OwnedMutexGuard};

/// Default acquisition deadline in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Held while a rule-engine invocation is in flight
pub type TokenGuard = OwnedMutexGuard<()>;

/// A clonable, cancellable mutual-exclusion token with a deadline
#[derive(Clone)]
pub struct SerialToken {
    lock: Arc<Mutex<()>>,
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    timeout: Duration,
}

impl SerialToken {
    /// Create a token with the given acquisition deadline
    pub fn new(timeout_ms: u64) -> Self {
        SerialToken {
            lock: Arc::new(Mutex::new(())),
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Acquire the token, waiting up to the deadline
    ///
    /// Fails with `LockCancelled` once `cancel` has been called, including
    /// for waiters already parked, and with `LockTimeout` past the deadline.
    pub async fn acquire(&self) -> Result<TokenGuard> {
        if self.is_cancelled() {
            return Err(Error::LockCancelled);
        }
        let lock = Arc::clone(&self.lock);
        tokio::select! {
            guard = lock.lock_owned() => {
                // Cancellation may have landed while we were parked
                if self.is_cancelled() {
                    Err(Error::LockCancelled)
                } else {
                    Ok(guard)
                }
            }
            _ = self.notify.notified() => Err(Error::LockCancelled),
            _ = tokio::time::sleep(self.timeout) => {
                Err(Error::LockTimeout(self.timeout.as_millis() as u64))
            }
        }
    }

    /// Reject all current and future waiters
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for SerialToken {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_acquisitions_succeed() {
        let token = SerialToken::new(100);
        drop(token.acquire().await.expect("first"));
        drop(token.acquire().await.expect("second"));
    }

    #[tokio::test]
    async fn acquisition_times_out_while_held() {
        let token = SerialToken::new(20);
        let _held = token.acquire().await.expect("holder");
        match token.acquire().await {
            Err(Error::LockTimeout(ms)) => assert_eq!(ms, 20),
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn cancel_rejects_parked_waiter() {
        let token = SerialToken::new(5000);
        let held = token.acquire().await.expect("holder");

        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.acquire().await.map(|_| ()) })
        };
        // Let the waiter park on the lock before cancelling
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let res = waiter.await.expect("join");
        assert!(matches!(res, Err(Error::LockCancelled)));
        drop(held);
    }

    #[tokio::test]
    async fn cancelled_token_rejects_immediately() {
        let token = SerialToken::default();
        token.cancel();
        assert!(matches!(token.acquire().await, Err(Error::LockCancelled)));
    }
}
