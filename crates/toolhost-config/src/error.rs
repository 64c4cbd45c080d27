//! Configuration errors

use std::io;
use std::path::PathBuf;

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The content is not valid for its format
    #[error("Failed to parse {format}: {message}")]
    Parse {
        /// Format name
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// The file extension names no supported format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A referenced environment variable is unset and has no default
    #[error("Environment variable '{0}' not set and no default provided")]
    MissingEnv(String),

    /// A value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a validation error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
