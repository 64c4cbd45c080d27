//! Configuration validation

use tracing_subscriber::EnvFilter;

use crate::error::{ConfigError, Result};
use crate::types::HostConfig;

/// Validate configuration
pub fn validate_config(config: &HostConfig) -> Result<()> {
    validate_log_level(&config.log_level)
}

/// The log level is handed to `EnvFilter` as is, so it must parse as one:
/// a bare level, a target, or comma-separated `target=level` directives.
fn validate_log_level(filter: &str) -> Result<()> {
    if filter.trim().is_empty() {
        return Err(ConfigError::invalid("log_level must not be empty"));
    }

    EnvFilter::try_new(filter)
        .map(|_| ())
        .map_err(|e| ConfigError::invalid(format!("invalid log_level '{filter}': {e}")))
}
