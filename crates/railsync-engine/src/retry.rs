//! Bounded retry for flaky asynchronous operations.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Bounds applied to a retried operation.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    /// Fixed delay between attempts.
    pub delay: Option<Duration>,
    /// Cap on the number of attempts.
    pub max_retries: Option<u32>,
}

/// Repeatedly invoke `op` until it yields a value, the wall-clock
/// `timeout` elapses, or the policy's attempt cap is reached.
///
/// `op` signals a failed attempt by returning `None`. Exhaustion
/// resolves to `None`, never an error; callers that require a hard
/// failure check the return value and raise their own.
pub async fn retry<F, Fut, R>(op: F, timeout: Duration, policy: RetryPolicy) -> Option<R>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<R>>,
{
    retry_until(op, timeout, policy, |_| true).await
}

/// Like [`retry`], with a caller-supplied acceptance predicate applied
/// to each yielded value.
pub async fn retry_until<F, Fut, R, P>(
    mut op: F,
    timeout: Duration,
    policy: RetryPolicy,
    accept: P,
) -> Option<R>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<R>>,
    P: Fn(&R) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut attempts: u32 = 0;
    loop {
        if let Some(value) = op().await {
            if accept(&value) {
                return Some(value);
            }
        }
        attempts += 1;
        if policy.max_retries.is_some_and(|max| attempts >= max) {
            return None;
        }
        if Instant::now() >= deadline {
            return None;
        }
        if let Some(delay) = policy.delay {
            sleep(delay).await;
        }
    }
}
