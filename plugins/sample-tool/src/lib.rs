//! # Sample Tool
//!
//! Demonstrates how to build a tool module: an options type parsed by
//! `clap`, a [`Tool`] implementation and the `export_tools!` entry point.
//!
//! Build it as a shared library and hand it to the host:
//!
//! ```text
//! cargo build -p sample-tool --release
//! toolhost target/release/libsample_tool.so --required-option value --optional-option2 a b
//! ```

use clap::Parser;
use toolhost_api::prelude::*;
use tracing::{debug, error, info, warn};

/// Sample tool options
#[derive(Debug, Clone, Parser)]
#[command(about = "Logs its options at several levels")]
pub struct SampleOptions {
    /// Option with a default value
    #[arg(long, default_value = "default")]
    pub default_option: String,

    /// Option that must be given
    #[arg(long)]
    pub required_option: String,

    /// Option that may be omitted
    #[arg(long)]
    pub optional_option: Option<String>,

    /// Option taking any number of values
    #[arg(long, num_args = 1..)]
    pub optional_option2: Vec<String>,
}

/// Sample tool
#[derive(Debug, Default)]
pub struct SampleTool {
    runs: usize,
    last_summary: Option<String>,
}

impl SampleTool {
    /// Number of completed runs
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Summary produced by the last run, if it succeeded
    pub fn last_summary(&self) -> Option<&str> {
        self.last_summary.as_deref()
    }
}

impl Tool for SampleTool {
    type Config = SampleOptions;

    fn title(&self) -> &str {
        "Sample Tool"
    }

    fn execute(&mut self, options: SampleOptions) {
        info!(
            default_option = %options.default_option,
            required_option = %options.required_option,
            "Sample tool running"
        );
        debug!(optional_option = ?options.optional_option, "Optional option");

        if options.optional_option.is_none() {
            warn!("optional-option not given");
        }

        match summarize(&options.optional_option2) {
            Ok(summary) => {
                info!(%summary, "Values summarized");
                self.last_summary = Some(summary);
            }
            Err(e) => {
                error!(error = %e, "Failed to summarize values");
                self.last_summary = None;
            }
        }

        self.runs += 1;
    }
}

/// Join the values of `--optional-option2`
fn summarize(values: &[String]) -> toolhost_api::error::Result<String> {
    if values.is_empty() {
        return Err(ToolError::runtime("no values for --optional-option2"));
    }
    Ok(format!("{} value(s): {}", values.len(), values.join(", ")))
}

toolhost_api::export_tools!(SampleTool);
