//! Per-entity ordered operation queue.
//!
//! Each visual entity owns one [`OperationQueue`]. Operations are enqueued
//! synchronously and executed one at a time, in enqueue order, by a worker
//! task dedicated to that queue. An operation only starts once the previous
//! one has settled, whatever its latency.
//!
//! # Failure Policy
//!
//! A failing (or panicking) operation is logged and reported through its
//! [`OperationHandle`], then the queue moves on. One failed fetch can never
//! stall the rest of an entity's pipeline.
//!
//! # Example
//!
//! ```ignore
//! use choromap::queue::{OperationQueue, QueueError};
//!
//! let queue = OperationQueue::new("departements");
//!
//! let load = queue.enqueue("load", || async { fetch_geometry().await });
//! let render = queue.enqueue("render", || async { Ok::<_, QueueError>(draw()) });
//!
//! // `render` never starts before `load` has settled.
//! render.await?;
//! ```
//!
//! # Panics
//!
//! [`OperationQueue::new`] spawns the worker on the current Tokio runtime and
//! must be called from within one.

mod handle;
mod readiness;

pub use handle::{OperationHandle, QueueError};
pub use readiness::{Readiness, ReadinessError, ReadinessState};

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Boxed future type used for type-erased operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

// =============================================================================
// Queued Operation
// =============================================================================

/// An operation waiting for its turn.
struct QueuedOperation {
    label: String,
    sequence: u64,
    job: Job,
}

/// Counters shared between the queue and its worker.
#[derive(Debug, Default)]
struct QueueCounters {
    enqueued: AtomicU64,
    settled: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time view of a queue's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Operations enqueued since creation.
    pub enqueued: u64,
    /// Operations that have settled (successfully or not).
    pub settled: u64,
    /// Operations that failed or panicked.
    pub failed: u64,
}

impl QueueStats {
    /// Operations queued or running.
    pub fn pending(&self) -> u64 {
        self.enqueued.saturating_sub(self.settled)
    }
}

// =============================================================================
// Operation Queue
// =============================================================================

/// Serializer of asynchronous operations for a single entity.
///
/// Queues are never shared between entities, and two queues give no ordering
/// guarantee relative to each other.
pub struct OperationQueue {
    owner: String,
    tx: mpsc::UnboundedSender<QueuedOperation>,
    counters: Arc<QueueCounters>,
    shutdown: CancellationToken,
}

impl OperationQueue {
    /// Creates a queue for `owner` and spawns its worker.
    pub fn new(owner: impl Into<String>) -> Self {
        let owner = owner.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(QueueCounters::default());
        let shutdown = CancellationToken::new();

        tokio::spawn(drain(
            owner.clone(),
            rx,
            Arc::clone(&counters),
            shutdown.clone(),
        ));

        Self {
            owner,
            tx,
            counters,
            shutdown,
        }
    }

    /// Returns the name of the owning entity.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Appends an operation to the tail of the queue.
    ///
    /// `factory` is only invoked once every previously enqueued operation has
    /// settled. Returns immediately with a handle on the eventual result.
    pub fn enqueue<F, Fut, T, E>(&self, label: impl Into<String>, factory: F) -> OperationHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<QueueError> + Display + Send + 'static,
    {
        let label = label.into();
        let sequence = self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        let (result_tx, result_rx) = oneshot::channel();

        let owner = self.owner.clone();
        let job_label = label.clone();
        let counters = Arc::clone(&self.counters);
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let outcome = AssertUnwindSafe(async move { factory().await })
                    .catch_unwind()
                    .await;

                let result = match outcome {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(queue = %owner, operation = %job_label, error = %e, "Queued operation failed");
                        Err(e)
                    }
                    Err(_) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(queue = %owner, operation = %job_label, "Queued operation panicked");
                        Err(E::from(QueueError::Panicked { label: job_label }))
                    }
                };

                counters.settled.fetch_add(1, Ordering::Relaxed);
                // The caller may have dropped the handle; that is fine.
                let _ = result_tx.send(result);
            })
        });

        let queued = QueuedOperation {
            label: label.clone(),
            sequence,
            job,
        };

        if self.tx.send(queued).is_err() {
            // Worker is gone; the dropped job settles the handle as Closed.
            debug!(queue = %self.owner, operation = %label, "Enqueue on closed queue");
            self.counters.settled.fetch_add(1, Ordering::Relaxed);
        } else {
            trace!(queue = %self.owner, operation = %label, sequence, "Operation enqueued");
        }

        OperationHandle::new(self.owner.clone(), label, result_rx)
    }

    /// Waits until every operation enqueued so far has settled.
    pub async fn idle(&self) {
        let marker: OperationHandle<(), QueueError> = self.enqueue("idle", || async { Ok(()) });
        let _ = marker.settled().await;
    }

    /// Returns a snapshot of the queue counters.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            settled: self.counters.settled.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Number of operations queued or running.
    pub fn pending(&self) -> u64 {
        self.stats().pending()
    }

    /// Stops the worker. Operations not yet started settle as
    /// [`QueueError::Closed`].
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Returns true once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl std::fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationQueue")
            .field("owner", &self.owner)
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Runs queued operations one at a time until the queue is dropped or closed.
async fn drain(
    owner: String,
    mut rx: mpsc::UnboundedReceiver<QueuedOperation>,
    counters: Arc<QueueCounters>,
    shutdown: CancellationToken,
) {
    debug!(queue = %owner, "Operation queue worker starting");

    loop {
        let operation = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!(queue = %owner, "Operation queue closed");
                break;
            }

            next = rx.recv() => match next {
                Some(operation) => operation,
                None => break,
            },
        };

        trace!(
            queue = %owner,
            operation = %operation.label,
            sequence = operation.sequence,
            "Starting queued operation"
        );
        (operation.job)().await;
    }

    // Whatever is still buffered is dropped here, settling those handles
    // as Closed.
    rx.close();
    while let Ok(operation) = rx.try_recv() {
        counters.settled.fetch_add(1, Ordering::Relaxed);
        drop(operation);
    }

    debug!(queue = %owner, "Operation queue worker stopped");
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn record(log: &Arc<Mutex<Vec<String>>>, entry: &str) {
        log.lock().push(entry.to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_run_in_enqueue_order_regardless_of_latency() {
        let queue = OperationQueue::new("layer");
        let log = Arc::new(Mutex::new(Vec::new()));

        let slow_log = Arc::clone(&log);
        let slow = queue.enqueue("slow", move || async move {
            record(&slow_log, "slow:start");
            tokio::time::sleep(Duration::from_millis(500)).await;
            record(&slow_log, "slow:end");
            Ok::<_, QueueError>(())
        });

        let fast_log = Arc::clone(&log);
        let fast = queue.enqueue("fast", move || async move {
            record(&fast_log, "fast:start");
            Ok::<_, QueueError>(())
        });

        fast.await.unwrap();
        slow.await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["slow:start", "slow:end", "fast:start"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_operation_in_flight() {
        let queue = OperationQueue::new("layer");
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let running = Arc::clone(&running);
            let max_running = Arc::clone(&max_running);
            handles.push(queue.enqueue(format!("op{}", i), move || async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10 * (8 - i))).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, QueueError>(i)
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), i as u64);
        }
        assert_eq!(max_running.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_halt_queue() {
        let queue = OperationQueue::new("layer");

        let failing = queue.enqueue("load", || async {
            Err::<(), _>(QueueError::failed("load", "unreachable"))
        });
        let after = queue.enqueue("render", || async { Ok::<_, QueueError>(42) });

        assert!(matches!(failing.await, Err(QueueError::Failed { .. })));
        assert_eq!(after.await.unwrap(), 42);
        assert_eq!(queue.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let queue = OperationQueue::new("layer");

        let panicking: OperationHandle<(), QueueError> =
            queue.enqueue("boom", || async {
                if true {
                    panic!("task exploded");
                }
                Ok(())
            });
        let after = queue.enqueue("render", || async { Ok::<_, QueueError>("drawn") });

        assert_eq!(
            panicking.await.unwrap_err(),
            QueueError::Panicked {
                label: "boom".into()
            }
        );
        assert_eq!(after.await.unwrap(), "drawn");
    }

    #[tokio::test(start_paused = true)]
    async fn test_queues_are_independent() {
        let first = OperationQueue::new("first");
        let second = OperationQueue::new("second");
        let log = Arc::new(Mutex::new(Vec::new()));

        let slow_log = Arc::clone(&log);
        let slow = first.enqueue("slow", move || async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            record(&slow_log, "first");
            Ok::<_, QueueError>(())
        });
        let quick_log = Arc::clone(&log);
        let quick = second.enqueue("quick", move || async move {
            record(&quick_log, "second");
            Ok::<_, QueueError>(())
        });

        quick.await.unwrap();
        slow.await.unwrap();
        assert_eq!(*log.lock(), vec!["second", "first"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_waits_for_everything_enqueued() {
        let queue = OperationQueue::new("layer");
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = Arc::clone(&done);
            let _ = queue.enqueue("step", move || async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<_, QueueError>(())
            });
        }

        queue.idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_settles_waiting_operations_as_closed() {
        let queue = OperationQueue::new("layer");

        let running = queue.enqueue("running", || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, QueueError>(())
        });
        let waiting = queue.enqueue("waiting", || async { Ok::<_, QueueError>(()) });

        tokio::time::sleep(Duration::from_millis(1)).await;
        queue.close();

        assert!(running.await.is_ok());
        assert!(matches!(waiting.await, Err(QueueError::Closed { .. })));
        assert!(queue.is_closed());
    }
}
