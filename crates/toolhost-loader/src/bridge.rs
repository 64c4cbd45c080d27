//! Configuration bridge: tool arguments to an opaque configuration value

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use toolhost_api::abi::{DropConfigFn, ParseStatus, StrRef, TextSink};
use tracing::debug;

use crate::module::LoadedModule;
use crate::scanner::Capability;

/// Outcome of parsing tool arguments
#[derive(Debug)]
pub enum ParseOutcome {
    /// Arguments parsed into the tool's configuration
    Parsed(ConfigValue),

    /// Usage text was requested; the tool must not run
    ShowUsage,

    /// Arguments were rejected; carries the parser's diagnostic
    Failed(String),
}

impl ParseOutcome {
    /// Check if the arguments were parsed
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

/// A parsed configuration value of a type known only to its module.
///
/// Owned exclusively by the invocation it is handed to; dropped through the
/// module when it is never invoked.
pub struct ConfigValue {
    module: Arc<LoadedModule>,
    config_type: String,
    ptr: Option<NonNull<c_void>>,
    drop_config: DropConfigFn,
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigValue")
            .field("module", &self.module.name())
            .field("config_type", &self.config_type)
            .finish()
    }
}

impl ConfigValue {
    /// Fully qualified type name of the value
    pub fn config_type(&self) -> &str {
        &self.config_type
    }

    pub(crate) fn module(&self) -> &Arc<LoadedModule> {
        &self.module
    }

    /// Release ownership of the boxed value to the caller.
    ///
    /// The pointer must be handed to the matching descriptor's `execute` or
    /// `drop_config`, otherwise it leaks.
    pub fn into_raw(mut self) -> *mut c_void {
        self.ptr
            .take()
            .map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }
}

impl Drop for ConfigValue {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: produced by the same descriptor's `parse` and never
            // handed to `execute`.
            unsafe { (self.drop_config)(ptr.as_ptr()) };
        }
    }
}

/// Runs a tool's argument parser
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigBridge;

impl ConfigBridge {
    /// Parse `args` into `capability`'s configuration type
    pub fn parse(capability: &Capability, args: &[String]) -> ParseOutcome {
        let descriptor = capability.descriptor();
        let raw_args: Vec<StrRef> = args.iter().map(|arg| StrRef::new(arg)).collect();
        let mut diagnostics = String::new();

        // SAFETY: `raw_args` borrows `args` and both outlive the call; the
        // sink's buffer outlives the call.
        let raw = unsafe {
            (descriptor.parse)(
                raw_args.as_ptr(),
                raw_args.len(),
                TextSink::collect(&mut diagnostics),
            )
        };

        match raw.status {
            ParseStatus::Parsed => match NonNull::new(raw.config) {
                Some(ptr) => {
                    debug!(config = %descriptor.config_type(), "Tool arguments parsed");
                    ParseOutcome::Parsed(ConfigValue {
                        module: Arc::clone(capability.module()),
                        config_type: descriptor.config_type().to_string(),
                        ptr: Some(ptr),
                        drop_config: descriptor.drop_config,
                    })
                }
                None => ParseOutcome::Failed("parser returned no configuration".to_string()),
            },
            ParseStatus::ShowUsage => ParseOutcome::ShowUsage,
            ParseStatus::Failed => ParseOutcome::Failed(diagnostics),
        }
    }

    /// Render `capability`'s usage text
    pub fn usage(capability: &Capability) -> String {
        let mut usage = String::new();
        // SAFETY: the buffer outlives the call.
        unsafe { (capability.descriptor().usage)(TextSink::collect(&mut usage)) };
        usage
    }
}
