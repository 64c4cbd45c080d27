//! Configuration types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Log level or filter directive (e.g. `info`, `toolhost_loader=debug`)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// When to wait for the user before exiting
    #[serde(default)]
    pub pause: PauseMode,

    /// How the tool call site is bound
    #[serde(default)]
    pub bind: BindMode,

    /// Set the terminal title while a tool runs
    #[serde(default = "default_true")]
    pub set_title: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pause: PauseMode::default(),
            bind: BindMode::default(),
            set_title: true,
        }
    }
}

/// Exit pause behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseMode {
    /// Pause under a debugger or when started outside a shell
    #[default]
    Auto,
    /// Always pause
    Always,
    /// Never pause
    Never,
}

impl FromStr for PauseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(PauseMode::Auto),
            "always" => Ok(PauseMode::Always),
            "never" => Ok(PauseMode::Never),
            other => Err(format!("unknown pause mode: {other}")),
        }
    }
}

impl fmt::Display for PauseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PauseMode::Auto => "auto",
            PauseMode::Always => "always",
            PauseMode::Never => "never",
        })
    }
}

/// Call-site binding strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Write-once dispatch slot
    #[default]
    Slot,
    /// Patch a compiled placeholder (requires the `code-patch` feature)
    Patch,
}

impl FromStr for BindMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slot" => Ok(BindMode::Slot),
            "patch" => Ok(BindMode::Patch),
            other => Err(format!("unknown bind mode: {other}")),
        }
    }
}

impl fmt::Display for BindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindMode::Slot => "slot",
            BindMode::Patch => "patch",
        })
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
