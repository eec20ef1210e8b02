//! Remote run/result API surface for railsync.
//!
//! Exposes the [`RunApi`] trait — the set of run/case/result operations
//! the sync engine orchestrates — and [`TestRailClient`], a reqwest-backed
//! implementation speaking the TestRail-style `index.php?/api/v2` wire
//! protocol with basic authentication.

pub mod api;
pub mod error;
pub mod http;
pub mod types;

pub use api::RunApi;
pub use error::ClientError;
pub use http::TestRailClient;
pub use types::{Run, RunPayload, RunTest, SubmittedResult, User};
