//! Engine errors.

use thiserror::Error;

use railsync_client::ClientError;

use crate::config::ConfigError;

/// Errors surfaced by the sync engine.
///
/// Only configuration and authentication problems abort a session;
/// everything else is degraded gracefully inside the engine and logged.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or malformed configuration; fatal before any remote call.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The remote rejected the credentials; fatal.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A remote call failed past the engine's recovery policies.
    #[error("remote client error: {0}")]
    Client(#[from] ClientError),

    /// The batch-repair search could not converge.
    #[error("case-set reconciliation failed: {0}")]
    Reconcile(String),
}
