//! Tool-side logging bootstrap.
//!
//! A tool module compiled as a shared library carries its own copy of
//! `tracing`, with its own global dispatcher. Events emitted by the tool go
//! nowhere until a subscriber is installed inside the module, so the entry
//! point shim calls [`init`] before handing control to the tool.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter shared by host and tools
pub const LOG_ENV: &str = "TOOLHOST_LOG";

/// Default filter when [`LOG_ENV`] is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Install a formatting subscriber for this module.
///
/// Does nothing when a subscriber is already installed, which is always the
/// case for tools linked statically into the host.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        tracing::info!("logging initialized twice");
    }
}
