//! Rate-limited FIFO dispatch of deferred operations.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::limiter::RateLimiter;

type BoxedOp = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Polling cadence for [`DispatchQueue::await_idle`].
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors from dispatch-queue synchronization.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue did not clear within the allotted time.
    #[error("timeout waiting for dispatch queue to clear: {pending} queued, {in_flight} in flight")]
    IdleTimeout { pending: usize, in_flight: usize },
}

struct Shared {
    ops: Mutex<VecDeque<BoxedOp>>,
    in_flight: AtomicUsize,
    limiter: tokio::sync::Mutex<RateLimiter>,
}

impl Shared {
    fn ops(&self) -> MutexGuard<'_, VecDeque<BoxedOp>> {
        self.ops.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Decrements the in-flight count even if the operation panics.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// FIFO queue of deferred operations drained at a fixed rate.
///
/// Producers may enqueue as fast as they like; the drain loop acquires
/// one rate-limiter token per operation before invoking it, so the
/// outbound call rate never exceeds the configured quota. Operations
/// execute sequentially in enqueue order.
pub struct DispatchQueue {
    shared: Arc<Shared>,
    drain: Option<JoinHandle<()>>,
}

impl DispatchQueue {
    /// A queue limited to `requests_per_interval` operations per
    /// `interval`.
    pub fn new(requests_per_interval: usize, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                ops: Mutex::new(VecDeque::new()),
                in_flight: AtomicUsize::new(0),
                limiter: tokio::sync::Mutex::new(RateLimiter::new(requests_per_interval, interval)),
            }),
            drain: None,
        }
    }

    /// Queue one deferred operation.
    pub fn enqueue<F, Fut>(&self, op: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let boxed: BoxedOp = Box::new(move || Box::pin(op()));
        self.shared.ops().push_back(boxed);
    }

    /// Operations waiting in the queue.
    pub fn pending(&self) -> usize {
        self.shared.ops().len()
    }

    /// Operations currently executing.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// True when nothing is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0 && self.in_flight() == 0
    }

    /// Drain the queue on the current task: one rate-limiter token per
    /// operation, FIFO order, no overlap between operations.
    pub async fn run(&self) {
        Self::drain_loop(&self.shared).await;
    }

    /// Spawn the drain loop in the background.
    pub fn start(&mut self) {
        if self.drain.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        self.drain = Some(tokio::spawn(async move {
            Self::drain_loop(&shared).await;
        }));
    }

    async fn drain_loop(shared: &Shared) {
        loop {
            // Count the operation as in flight before it leaves the
            // queue so await_idle never observes a false idle window.
            let guard = InFlightGuard::new(&shared.in_flight);
            let Some(op) = shared.ops().pop_front() else {
                drop(guard);
                break;
            };
            shared.limiter.lock().await.acquire().await;
            op().await;
            drop(guard);
        }
    }

    /// Resolve once the queue is empty and nothing is in flight, or
    /// fail once `timeout` has elapsed without that happening.
    pub async fn await_idle(&self, timeout: Duration) -> Result<(), QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_idle() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(QueueError::IdleTimeout {
                    pending: self.pending(),
                    in_flight: self.in_flight(),
                });
            }
            debug!(
                pending = self.pending(),
                in_flight = self.in_flight(),
                "waiting for dispatch queue to clear"
            );
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    /// Cancel the background drain task, if any. In-flight remote calls
    /// are abandoned, not interrupted server-side.
    pub fn stop(&mut self) {
        if let Some(handle) = self.drain.take() {
            handle.abort();
        }
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        self.stop();
    }
}
