//! # Toolhost API
//!
//! This crate provides the SDK for writing tools loaded by the `toolhost`
//! plugin host.
//!
//! A tool is a type implementing [`Tool`]. Its associated configuration type
//! is parsed from the process arguments that follow the module path; any
//! [`clap::Parser`] type works. A module exports its tools with
//! [`export_tools!`], which builds the capability-description table the host
//! scans after loading the module.
//!
//! ## Example
//!
//! ```rust,no_run
//! use toolhost_api::prelude::*;
//!
//! #[derive(Debug, clap::Parser)]
//! struct Options {
//!     /// Who to greet
//!     #[arg(long)]
//!     name: String,
//! }
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! impl Tool for Greeter {
//!     type Config = Options;
//!
//!     fn title(&self) -> &str {
//!         "Greeter"
//!     }
//!
//!     fn execute(&mut self, options: Options) {
//!         tracing::info!(name = %options.name, "hello");
//!     }
//! }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod abi;
pub mod error;
pub mod logging;
mod macros;
pub mod tool;

// Re-export commonly used types
pub use abi::{ToolDescriptor, ToolTable, TOOLHOST_ABI_VERSION, TOOL_TABLE_SYMBOL};
pub use error::ToolError;
pub use tool::{ParseResult, Tool, ToolConfig};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::error::ToolError;
    pub use crate::tool::{ParseResult, Tool, ToolConfig};
}
