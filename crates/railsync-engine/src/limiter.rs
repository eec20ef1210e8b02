//! Outbound request-rate limiting.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Sliding-window rate limiter: at most `limit` acquisitions within any
/// window of `interval`, measured on a monotonic clock.
///
/// The window is examined synchronously at each acquisition; when no
/// token is available the caller sleeps exactly until the oldest one
/// falls out of the window. No background timer is involved.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    interval: Duration,
    issued: VecDeque<Instant>,
}

impl RateLimiter {
    /// Limit of `limit` acquisitions per `interval`.
    ///
    /// `limit` must be positive.
    pub fn new(limit: usize, interval: Duration) -> Self {
        assert!(limit > 0, "rate limit must be positive");
        Self {
            limit,
            interval,
            issued: VecDeque::with_capacity(limit),
        }
    }

    fn prune(&mut self, now: Instant) {
        while self
            .issued
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.interval)
        {
            self.issued.pop_front();
        }
    }

    /// Wait until a token is available, then consume it.
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            self.prune(now);
            if self.issued.len() < self.limit {
                self.issued.push_back(now);
                return;
            }
            // The oldest acquisition leaves the window first.
            if let Some(&oldest) = self.issued.front() {
                sleep_until(oldest + self.interval).await;
            }
        }
    }

    /// Tokens available right now without waiting.
    pub fn available(&mut self) -> usize {
        self.prune(Instant::now());
        self.limit - self.issued.len()
    }
}
