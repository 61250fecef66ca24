//! Logging utilities for taskboard
//!
//! Subscriber setup for binaries and tests, plus a wrapper for printing
//! serde values readably inside tracing statements.

use serde::Serialize;
use std::fmt::Debug;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Wrapper for pretty-printing types in logs as YAML
///
/// ```ignore
/// use taskboard_common::Pretty;
/// use tracing::debug;
///
/// debug!("server task: {}", Pretty(&task));
/// ```
///
/// Outputs YAML with a leading newline. Debug is used as a fallback if YAML
/// serialization fails.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> std::fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

impl<T: Serialize + Debug> std::fmt::Debug for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Failure to install the global tracing subscriber
#[derive(Debug, Error)]
pub enum LoggingInitError {
    /// The filter directive string did not parse
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    /// A global subscriber was already installed
    #[error("tracing subscriber already installed")]
    AlreadyInstalled,
}

/// Install a fmt subscriber filtered by `filter`.
///
/// `RUST_LOG` takes precedence over `filter` when set, so a running session can
/// be made more verbose without touching configuration.
pub fn init_tracing(filter: &str) -> Result<(), LoggingInitError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter).map_err(|e| LoggingInitError::InvalidFilter {
            filter: filter.to_string(),
            message: e.to_string(),
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|_| LoggingInitError::AlreadyInstalled)
}
