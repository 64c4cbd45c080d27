//! Tool error types

use std::fmt;

/// Tool error type
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// ABI version mismatch between host and module
    #[error("ABI version mismatch: module uses v{module}, host uses v{host}")]
    AbiMismatch {
        /// Version the module was built against
        module: u32,
        /// Version the host understands
        host: u32,
    },

    /// Malformed capability-description table
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Result type for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;

impl ToolError {
    /// Create a new runtime error
    pub fn runtime(msg: impl fmt::Display) -> Self {
        Self::RuntimeError(msg.to_string())
    }

    /// Create a new invalid descriptor error
    pub fn invalid_descriptor(msg: impl fmt::Display) -> Self {
        Self::InvalidDescriptor(msg.to_string())
    }
}
