//! One-shot readiness signal for asynchronously loaded resources.
//!
//! Datasets and layer geometry are fetched in the background while the
//! operations depending on them are already queued. A [`Readiness`] lets
//! those operations wait for the resource without polling.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

/// Current state of a readiness signal.
#[derive(Debug)]
pub enum ReadinessState<T> {
    /// The resource is still loading.
    Pending,
    /// The resource loaded successfully.
    Ready(Arc<T>),
    /// Loading failed; the reason is kept for every waiter.
    Failed(String),
}

impl<T> Clone for ReadinessState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Pending => Self::Pending,
            Self::Ready(value) => Self::Ready(Arc::clone(value)),
            Self::Failed(reason) => Self::Failed(reason.clone()),
        }
    }
}

/// Errors returned to readiness waiters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadinessError {
    /// The resource failed to load.
    #[error("{0}")]
    Failed(String),

    /// The caller-imposed timeout elapsed first.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Shared, settle-once readiness signal.
///
/// Cloning is cheap; every clone observes the same state. The first call to
/// [`resolve`](Self::resolve) or [`fail`](Self::fail) wins, later calls are
/// ignored.
pub struct Readiness<T> {
    tx: Arc<watch::Sender<ReadinessState<T>>>,
}

impl<T> Clone for Readiness<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> Default for Readiness<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Readiness<T> {
    /// Creates a pending signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ReadinessState::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Creates a signal that is already resolved.
    pub fn ready(value: T) -> Self {
        let signal = Self::new();
        signal.resolve(value);
        signal
    }

    /// Marks the resource as loaded. Returns false if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(ReadinessState::Ready(Arc::new(value)))
    }

    /// Marks the resource as failed. Returns false if already settled.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.settle(ReadinessState::Failed(reason.into()))
    }

    fn settle(&self, next: ReadinessState<T>) -> bool {
        let mut next = Some(next);
        self.tx.send_if_modified(|state| {
            if matches!(state, ReadinessState::Pending) {
                if let Some(next) = next.take() {
                    *state = next;
                }
                true
            } else {
                false
            }
        })
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> ReadinessState<T> {
        self.tx.borrow().clone()
    }

    /// Returns true once the resource loaded successfully.
    pub fn is_ready(&self) -> bool {
        matches!(*self.tx.borrow(), ReadinessState::Ready(_))
    }

    /// Returns true while the resource is still loading.
    pub fn is_pending(&self) -> bool {
        matches!(*self.tx.borrow(), ReadinessState::Pending)
    }

    /// Waits until the signal settles.
    ///
    /// A source that never answers keeps this pending forever; use
    /// [`wait_timeout`](Self::wait_timeout) to bound the wait.
    pub async fn wait(&self) -> Result<Arc<T>, ReadinessError> {
        let mut rx = self.tx.subscribe();
        let state = match rx
            .wait_for(|state| !matches!(state, ReadinessState::Pending))
            .await
        {
            Ok(state) => state.clone(),
            // Unreachable while `self` holds the sender.
            Err(_) => return Err(ReadinessError::Failed("readiness sender dropped".into())),
        };

        match state {
            ReadinessState::Ready(value) => Ok(value),
            ReadinessState::Failed(reason) => Err(ReadinessError::Failed(reason)),
            ReadinessState::Pending => Err(ReadinessError::Failed("still pending".into())),
        }
    }

    /// Waits until the signal settles or `timeout` elapses.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<Arc<T>, ReadinessError> {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(result) => result,
            Err(_) => Err(ReadinessError::TimedOut(timeout)),
        }
    }
}

impl<T> std::fmt::Debug for Readiness<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match *self.tx.borrow() {
            ReadinessState::Pending => "pending",
            ReadinessState::Ready(_) => "ready",
            ReadinessState::Failed(_) => "failed",
        };
        f.debug_struct("Readiness").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_resolves_after_resolve() {
        let signal = Readiness::new();
        let waiter = signal.clone();
        let task = tokio::spawn(async move { waiter.wait().await });

        assert!(signal.resolve(7_u32));
        let value = task.await.unwrap().unwrap();
        assert_eq!(*value, 7);
    }

    #[tokio::test]
    async fn test_first_settle_wins() {
        let signal = Readiness::new();
        assert!(signal.fail("unreachable"));
        assert!(!signal.resolve(1_u8));

        let result = signal.wait().await;
        assert_eq!(result.unwrap_err(), ReadinessError::Failed("unreachable".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_on_pending_signal() {
        let signal: Readiness<()> = Readiness::new();
        let result = signal.wait_timeout(Duration::from_secs(5)).await;
        assert_eq!(
            result.unwrap_err(),
            ReadinessError::TimedOut(Duration::from_secs(5))
        );
        assert!(signal.is_pending());
    }

    #[test]
    fn test_ready_constructor() {
        let signal = Readiness::ready("topology");
        assert!(signal.is_ready());
        assert!(!signal.is_pending());
    }
}
