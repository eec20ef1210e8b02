//! Core domain errors.

use thiserror::Error;

/// Core domain errors for railsync.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A case token did not have the `C<digits>` shape.
    #[error("Invalid case token: {0}")]
    InvalidCaseToken(String),
}
