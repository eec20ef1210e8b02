//! railsync Run-Synchronization Engine
//!
//! Reconciles automated test results with a remote test-case-management
//! run. The remote API rejects an entire batch update when any single
//! case identifier in it is invalid, enforces a request-rate quota, and
//! may fail transiently; the pieces here deal with each of those:
//!
//! - [`reconcile::CaseSetReconciler`] — owns the run's case list and
//!   repairs rejected batch updates by divide-and-conquer isolation of
//!   the invalid identifiers.
//! - [`queue::DispatchQueue`] — FIFO queue of deferred operations
//!   drained at a fixed quota per time window.
//! - [`retry`] — bounded retry-until-accepted for flaky calls.
//! - [`aggregate::ResultAggregator`] — maps test outcomes to remote
//!   status codes and comment bodies, fanned out per case identifier.
//! - [`engine::SyncEngine`] — composition root sequencing attach →
//!   submit → upload attachments → close.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod logging;
pub mod queue;
pub mod reconcile;
pub mod retry;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use aggregate::ResultAggregator;
pub use config::{Config, ConfigError, RunSelection};
pub use engine::{SyncEngine, SyncReport};
pub use error::EngineError;
pub use limiter::RateLimiter;
pub use logging::init_logging;
pub use queue::{DispatchQueue, QueueError};
pub use reconcile::CaseSetReconciler;
pub use retry::{retry, retry_until, RetryPolicy};
