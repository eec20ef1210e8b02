//! Engine configuration.

use std::time::Duration;

use railsync_core::{ProjectId, RunId};
use thiserror::Error;

/// Default run name prefix when none is configured.
pub const DEFAULT_RUN_BASE_NAME: &str = "Automated Test Run";

/// Configuration errors; fatal before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("environment variable {name} has invalid value: {value}")]
    InvalidVar { name: &'static str, value: String },

    /// A required field is empty.
    #[error("configuration field {0} must not be empty")]
    EmptyField(&'static str),

    /// The outbound rate quota must be positive.
    #[error("requests_per_interval must be positive")]
    ZeroRate,
}

/// Which remote run a session synchronizes against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSelection {
    /// Reuse an existing run.
    Existing(RunId),
    /// Create a new run in the project, named from the base name plus
    /// the current date.
    CreateNew {
        project_id: ProjectId,
        run_base_name: String,
    },
}

/// Explicit engine configuration.
///
/// Replaces ambient environment access: everything the engine consumes
/// is enumerated here and passed into the constructor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote host, e.g. `https://example.testrail.io`.
    pub host: String,
    pub username: String,
    pub password: String,
    pub run: RunSelection,
    /// Close the run once all results are submitted (CI mode).
    pub auto_close: bool,
    /// Outbound request quota: this many calls per `interval`.
    pub requests_per_interval: usize,
    pub interval: Duration,
}

impl Config {
    /// Read configuration from `TESTRAIL_*` environment variables plus
    /// the `CI` flag.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), with an injectable variable
    /// source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };
        let host = require("TESTRAIL_HOST")?;
        let username = require("TESTRAIL_USERNAME")?;
        let password = require("TESTRAIL_PASSWORD")?;

        let run = match lookup("TESTRAIL_RUN_ID").filter(|v| !v.is_empty()) {
            Some(raw) => {
                let id = raw.parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                    name: "TESTRAIL_RUN_ID",
                    value: raw.clone(),
                })?;
                RunSelection::Existing(RunId::new(id))
            }
            None => {
                let raw = require("TESTRAIL_PROJECT_ID")?;
                let id = raw.parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                    name: "TESTRAIL_PROJECT_ID",
                    value: raw.clone(),
                })?;
                RunSelection::CreateNew {
                    project_id: ProjectId::new(id),
                    run_base_name: lookup("TESTRAIL_RUN_BASE_NAME")
                        .filter(|v| !v.is_empty())
                        .unwrap_or_else(|| DEFAULT_RUN_BASE_NAME.to_string()),
                }
            }
        };

        Ok(Self {
            host,
            username,
            password,
            run,
            auto_close: lookup("CI").as_deref() == Some("true"),
            requests_per_interval: 90,
            interval: Duration::from_secs(60),
        })
    }

    /// Validate a hand-built configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::EmptyField("host"));
        }
        if self.username.is_empty() {
            return Err(ConfigError::EmptyField("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::EmptyField("password"));
        }
        if self.requests_per_interval == 0 {
            return Err(ConfigError::ZeroRate);
        }
        Ok(())
    }
}
