//! # Toolhost Loader
//!
//! Host side of the tool runtime:
//! - Loading tool modules, once per logical name
//! - Discovering the single tool type a module exports
//! - Parsing tool arguments into the tool's own configuration type
//! - Binding a fixed call site to the tool's entry point and invoking it
//!
//! ```no_run
//! use toolhost_loader::{DispatchSlot, ModuleLoader, RunOutcome, Session};
//!
//! # fn main() -> toolhost_loader::Result<()> {
//! let args = vec!["--required".to_string(), "value".to_string()];
//! let loader = ModuleLoader::global();
//! let mut session = Session::new(loader, DispatchSlot::global(), std::io::stdout());
//!
//! match session.run("target/release/libsample_tool.so", &args)? {
//!     RunOutcome::Executed { title } => println!("{title} finished"),
//!     RunOutcome::UsageShown => {}
//!     RunOutcome::ParseFailed(_) => std::process::exit(2),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod bridge;
pub mod error;
pub mod loader;
pub mod module;
pub mod scanner;
pub mod session;
pub mod trampoline;

#[cfg(test)]
mod fixtures;

pub use bridge::{ConfigBridge, ConfigValue, ParseOutcome};
pub use error::{LoaderError, Result};
pub use loader::ModuleLoader;
pub use module::{LoadedModule, ModuleKind, ModuleMetadata};
pub use scanner::{Capability, CapabilityScanner};
pub use session::{RunOutcome, Session};
pub use trampoline::{BindOutcome, CallSite, DispatchSlot, EntryPoint, Trampoline};

#[cfg(all(
    feature = "code-patch",
    unix,
    any(target_arch = "x86", target_arch = "x86_64")
))]
pub use trampoline::PatchedStub;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{LoaderError, Result};
    pub use crate::loader::ModuleLoader;
    pub use crate::session::{RunOutcome, Session};
    pub use crate::trampoline::{CallSite, DispatchSlot};
}
