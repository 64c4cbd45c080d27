//! # Toolhost Configuration
//!
//! Host configuration with support for:
//! - Multiple formats (YAML, TOML, JSON)
//! - Environment variable expansion (`${VAR}`, `${VAR:-default}`)
//! - Validation
//! - Default values

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod loader;
pub mod types;
pub mod validator;

pub use error::{ConfigError, Result};
pub use loader::{load_from_file, load_from_str};
pub use types::{BindMode, HostConfig, PauseMode};
pub use validator::validate_config;

use std::path::Path;

/// Load and validate configuration from a file
pub fn load<P: AsRef<Path>>(path: P) -> Result<HostConfig> {
    let config = load_from_file(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load and validate configuration from a string
pub fn load_str(content: &str, format: ConfigFormat) -> Result<HostConfig> {
    let config = load_from_str(content, format)?;
    validate_config(&config)?;
    Ok(config)
}

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Format name
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }
}
