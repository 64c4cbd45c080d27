//! Configuration loading

use crate::error::{ConfigError, Result};
use crate::{ConfigFormat, HostConfig};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load configuration from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<HostConfig> {
    let path = path.as_ref();

    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), format = format.as_str(), "Loading configuration");

    load_from_str(&content, format)
}

/// Expand environment variables in configuration string.
///
/// Supports `${VAR}` and `${VAR:-default}`.
pub fn expand_env_vars(content: &str) -> Result<String> {
    // ${VAR} or ${VAR:-default}
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| ConfigError::invalid(format!("invalid env var pattern: {e}")))?;

    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let var_name = var_name.as_str();

        let value = match (env::var(var_name), cap.get(3)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => return Err(ConfigError::MissingEnv(var_name.to_string())),
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Load configuration from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<HostConfig> {
    let expanded = expand_env_vars(content)?;

    let parse_error = |message: String| ConfigError::Parse {
        format: format.as_str(),
        message,
    };

    let config = match format {
        ConfigFormat::Yaml if expanded.trim().is_empty() => HostConfig::default(),
        ConfigFormat::Yaml => {
            serde_yaml::from_str(&expanded).map_err(|e| parse_error(e.to_string()))?
        }
        ConfigFormat::Toml => toml::from_str(&expanded).map_err(|e| parse_error(e.to_string()))?,
        ConfigFormat::Json => {
            serde_json::from_str(&expanded).map_err(|e| parse_error(e.to_string()))?
        }
    };

    Ok(config)
}
