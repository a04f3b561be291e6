//! Operation handles and queue-level errors.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

/// Failures raised by the queue itself rather than by an operation body.
///
/// Operation error types must be constructible from this so that a handle
/// can always settle, even when its operation never ran.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The operation body reported a failure.
    #[error("operation '{label}' failed: {message}")]
    Failed { label: String, message: String },

    /// The operation body panicked. The queue keeps draining.
    #[error("operation '{label}' panicked")]
    Panicked { label: String },

    /// The queue was closed before the operation could run.
    #[error("queue '{owner}' closed before '{label}' ran")]
    Closed { owner: String, label: String },
}

impl QueueError {
    /// Convenience constructor for operation failures.
    pub fn failed(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            label: label.into(),
            message: message.into(),
        }
    }
}

/// Handle on a queued operation.
///
/// Returned immediately by [`super::OperationQueue::enqueue`]. Awaiting it
/// (directly or through [`OperationHandle::settled`]) yields the operation's
/// result once it has run. Dropping a handle does not cancel the operation.
pub struct OperationHandle<T, E> {
    owner: String,
    label: String,
    rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> OperationHandle<T, E>
where
    E: From<QueueError>,
{
    pub(super) fn new(owner: String, label: String, rx: oneshot::Receiver<Result<T, E>>) -> Self {
        Self { owner, label, rx }
    }

    /// Returns the label the operation was enqueued with.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the name of the entity owning the queue.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Waits until the operation has settled and returns its result.
    pub async fn settled(self) -> Result<T, E> {
        self.await
    }
}

impl<T, E> Future for OperationHandle<T, E>
where
    E: From<QueueError>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The job was dropped without running: the queue was closed.
            Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(QueueError::Closed {
                owner: self.owner.clone(),
                label: self.label.clone(),
            }))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> std::fmt::Debug for OperationHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationHandle")
            .field("owner", &self.owner)
            .field("label", &self.label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_display() {
        let err = QueueError::failed("load", "network unreachable");
        assert_eq!(
            err.to_string(),
            "operation 'load' failed: network unreachable"
        );
    }

    #[tokio::test]
    async fn test_dropped_sender_settles_as_closed() {
        let (tx, rx) = oneshot::channel::<Result<(), QueueError>>();
        let handle = OperationHandle::new("layer".into(), "render".into(), rx);
        drop(tx);

        let result = handle.settled().await;
        assert!(matches!(result, Err(QueueError::Closed { .. })));
    }
}
