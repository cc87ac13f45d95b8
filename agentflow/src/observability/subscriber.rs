//! `tracing-subscriber` setup from [`LoggingConfig`].

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::AgentflowError;
use tracing_subscriber::EnvFilter;

/// Parses the configured filter directive.
///
/// # Errors
///
/// Returns `Observability` if the directive is not a valid `EnvFilter`.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, AgentflowError> {
    EnvFilter::try_new(&config.level).map_err(|e| {
        AgentflowError::Observability(format!("invalid log filter '{}': {e}", config.level))
    })
}

/// Installs the global subscriber.
///
/// Returns `Ok(false)` without changing anything when a global subscriber is
/// already installed, so repeated calls are harmless.
///
/// # Errors
///
/// Returns `Observability` if the filter directive is invalid.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool, AgentflowError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::debug!(level = %config.level, format = ?config.format, "Tracing initialized");
            Ok(true)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Tracing subscriber already installed");
            Ok(false)
        }
    }
}
