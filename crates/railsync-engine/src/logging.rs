//! Tracing setup for reporter processes embedding the engine.

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install a plain formatting subscriber at the given level.
///
/// Reporters run inside a test-runner process that usually has no
/// subscriber of its own; calling this once at startup makes the
/// engine's diagnostics visible on the runner's console.
pub fn init_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
