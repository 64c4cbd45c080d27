//! Loader error types

use std::fmt;
use std::path::Path;

/// Loader error type
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// The module file is missing, malformed or incompatible with the host
    #[error("Failed to load module '{path}': {reason}")]
    ModuleLoad {
        /// Path as given by the caller
        path: String,
        /// What went wrong
        reason: String,
    },

    /// No type in the module implements the tool contract
    #[error("No tool found in module '{module}': {reason}")]
    PluginNotFound {
        /// Logical module name
        module: String,
        /// What went wrong
        reason: String,
    },

    /// A configuration value was offered to a tool it was not parsed for
    #[error("Configuration type mismatch: expected {expected}, got {found}")]
    ConfigMismatch {
        /// Configuration type of the tool
        expected: String,
        /// Configuration type of the value
        found: String,
    },

    /// Binding the call site failed; nothing was invoked
    #[error("Patch error: {0}")]
    Patch(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

impl LoaderError {
    /// Create a new module load error
    pub fn module_load(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        Self::ModuleLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new plugin not found error
    pub fn plugin_not_found(module: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::PluginNotFound {
            module: module.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new patch error
    pub fn patch(msg: impl fmt::Display) -> Self {
        Self::Patch(msg.to_string())
    }
}
