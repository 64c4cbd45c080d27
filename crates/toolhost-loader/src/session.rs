//! The run sequence: load, discover, parse, bind, invoke

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bridge::{ConfigBridge, ParseOutcome};
use crate::error::Result;
use crate::loader::ModuleLoader;
use crate::module::LoadedModule;
use crate::scanner::{Capability, CapabilityScanner};
use crate::trampoline::{CallSite, Trampoline};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The tool ran to completion
    Executed {
        /// Display title of the tool
        title: String,
    },
    /// Usage text was written; the tool did not run
    UsageShown,
    /// Arguments were rejected; the diagnostic was written
    ParseFailed(String),
}

impl RunOutcome {
    /// Check if the tool ran
    pub fn is_executed(&self) -> bool {
        matches!(self, RunOutcome::Executed { .. })
    }
}

type TitleHook<'a> = Box<dyn FnMut(&str) + 'a>;

/// Drives one tool run against a loader and a call site.
///
/// Usage text and parse diagnostics go to `out`.
pub struct Session<'a, W: Write> {
    loader: &'a ModuleLoader,
    call_site: &'a dyn CallSite,
    out: W,
    title_hook: Option<TitleHook<'a>>,
}

impl<W: Write> fmt::Debug for Session<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("loader", &self.loader)
            .field("call_site", &self.call_site)
            .finish_non_exhaustive()
    }
}

impl<'a, W: Write> Session<'a, W> {
    /// Create a session
    pub fn new(loader: &'a ModuleLoader, call_site: &'a dyn CallSite, out: W) -> Self {
        Self {
            loader,
            call_site,
            out,
            title_hook: None,
        }
    }

    /// Call `hook` with the tool's display title once it is discovered
    pub fn on_title(mut self, hook: impl FnMut(&str) + 'a) -> Self {
        self.title_hook = Some(Box::new(hook));
        self
    }

    /// Load the module at `path` and run its tool with `args`
    pub fn run(&mut self, path: impl AsRef<Path>, args: &[String]) -> Result<RunOutcome> {
        let module = self.loader.load(path)?;
        self.run_module(&module, args)
    }

    /// Run the tool of an already loaded module with `args`
    pub fn run_module(
        &mut self,
        module: &Arc<LoadedModule>,
        args: &[String],
    ) -> Result<RunOutcome> {
        let mut capability = CapabilityScanner::discover(module)?;
        self.run_capability(&mut capability, args)
    }

    /// Run a discovered tool with `args`
    pub fn run_capability(
        &mut self,
        capability: &mut Capability,
        args: &[String],
    ) -> Result<RunOutcome> {
        let title = display_title(capability);
        if let Some(hook) = self.title_hook.as_mut() {
            hook(&title);
        }

        debug!(tool = %capability.type_name(), args = args.len(), "Parsing tool arguments");

        match ConfigBridge::parse(capability, args) {
            ParseOutcome::Parsed(config) => {
                Trampoline::new(self.call_site).invoke(capability, config)?;
                info!(tool = %capability.type_name(), "Tool finished");
                Ok(RunOutcome::Executed { title })
            }
            ParseOutcome::ShowUsage => {
                let usage = ConfigBridge::usage(capability);
                self.write_text(&usage)?;
                Ok(RunOutcome::UsageShown)
            }
            ParseOutcome::Failed(diagnostic) => {
                warn!(tool = %capability.type_name(), "Tool arguments rejected");
                self.write_text(&diagnostic)?;
                Ok(RunOutcome::ParseFailed(diagnostic))
            }
        }
    }

    /// Consume the session, returning its output
    pub fn into_output(self) -> W {
        self.out
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// The tool's own title, else its module's product title
fn display_title(capability: &Capability) -> String {
    let title = capability.title();
    if !title.trim().is_empty() {
        return title;
    }
    capability
        .module()
        .metadata()
        .map(|metadata| metadata.title())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::trampoline::DispatchSlot;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_run_module_executes() {
        let loader = ModuleLoader::new();
        let slot = DispatchSlot::new();
        let module = loader.register_static("echo", fixtures::echo_table());

        let mut session = Session::new(&loader, &slot, Vec::new());
        let outcome = session
            .run_module(&module, &args(&["--required", "session-run"]))
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Executed {
                title: "Echo".to_string()
            }
        );
        assert!(fixtures::recorded("session-run"));
        assert!(session.into_output().is_empty());
    }

    #[test]
    fn test_title_falls_back_to_product() {
        let loader = ModuleLoader::new();
        let slot = DispatchSlot::new();
        let module = loader.register_static("shout", fixtures::shout_table());

        let mut seen = Vec::new();
        let outcome = Session::new(&loader, &slot, Vec::new())
            .on_title(|title| seen.push(title.to_string()))
            .run_module(&module, &args(&["--required", "title-fallback"]))
            .unwrap();

        assert!(outcome.is_executed());
        assert_eq!(seen, vec!["shout-module v1.0.0".to_string()]);
    }

    #[test]
    fn test_usage_written_once() {
        let loader = ModuleLoader::new();
        let slot = DispatchSlot::new();
        let module = loader.register_static("echo", fixtures::echo_table());

        let mut session = Session::new(&loader, &slot, Vec::new());
        let outcome = session.run_module(&module, &args(&["--help"])).unwrap();
        assert_eq!(outcome, RunOutcome::UsageShown);
        assert!(!slot.is_bound());

        let output = String::from_utf8(session.into_output()).unwrap();
        assert_eq!(output.matches("Usage:").count(), 1);
        assert!(output.contains("--required"));
    }

    #[test]
    fn test_parse_failure_writes_diagnostic() {
        let loader = ModuleLoader::new();
        let slot = DispatchSlot::new();
        let module = loader.register_static("echo", fixtures::echo_table());

        let mut session = Session::new(&loader, &slot, Vec::new());
        let outcome = session.run_module(&module, &args(&["--bogus"])).unwrap();

        assert!(matches!(outcome, RunOutcome::ParseFailed(ref d) if d.contains("--bogus")));
        assert!(!slot.is_bound());
        let output = String::from_utf8(session.into_output()).unwrap();
        assert!(output.contains("--bogus"));
    }
}
