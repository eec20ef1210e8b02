//! Error types for the remote API client.

use thiserror::Error;

/// Errors that can occur when calling the remote run/result API.
///
/// The engine's recovery policies key off the classification here:
/// batch-validity rejections trigger the isolation search, transient
/// failures go through bounded retry, authentication failures are fatal.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials were rejected by the remote system.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// The remote rejected a batch payload as invalid, without naming
    /// which element(s) caused the rejection.
    #[error("batch rejected by remote: {0}")]
    InvalidBatch(String),

    /// Network-level or 5xx failure; safe to retry.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-retriable API error outside the categories above.
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// Failed to decode a response body.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failed to read an attachment from disk.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True for failures worth retrying (network blips, 5xx).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Http(_) | Self::Io(_))
    }

    /// True when the remote rejected a batch for containing invalid
    /// element(s).
    pub fn is_invalid_batch(&self) -> bool {
        matches!(self, Self::InvalidBatch(_))
    }

    /// Classify a non-success HTTP response.
    pub fn from_response(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(body),
            400 => Self::InvalidBatch(body),
            500..=599 => Self::Transient(format!("HTTP {status}: {body}")),
            _ => Self::Api { status, body },
        }
    }
}
