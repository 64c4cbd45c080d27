//! Toolhost CLI

mod shell;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use toolhost_api::logging::LOG_ENV;
use toolhost_config::{BindMode, HostConfig, PauseMode};
use toolhost_loader::{CallSite, DispatchSlot, ModuleLoader, RunOutcome, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code for rejected tool arguments
const EXIT_USAGE: u8 = 2;
/// Exit code for every other failure
const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Parser)]
#[command(name = "toolhost")]
#[command(about = "Load a tool module and run its tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "TOOLHOST_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directives (trace, debug, info, warn, error)
    #[arg(short, long, env = LOG_ENV)]
    log_level: Option<String>,

    /// Wait for Enter before exiting (auto, always, never)
    #[arg(long)]
    pause: Option<PauseMode>,

    /// Call-site binding (slot, patch)
    #[arg(long)]
    bind: Option<BindMode>,

    /// Leave the terminal title alone
    #[arg(long)]
    no_title: bool,

    /// Tool module followed by the tool's own arguments; prompts when omitted
    #[arg(
        value_name = "MODULE [ARGS]",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

impl Cli {
    /// Configuration file, overridden by flags
    fn resolve_config(&self) -> Result<HostConfig> {
        let mut config = match &self.config {
            Some(path) => toolhost_config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => HostConfig::default(),
        };

        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(pause) = self.pause {
            config.pause = pause;
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if self.no_title {
            config.set_title = false;
        }

        toolhost_config::validate_config(&config)?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    if let Err(e) = init_tracing(&config.log_level) {
        eprintln!("Error: {e:#}");
        return ExitCode::from(EXIT_FAILURE);
    }

    let code = match run(cli.command, &config) {
        Ok(RunOutcome::Executed { .. } | RunOutcome::UsageShown) => 0,
        Ok(RunOutcome::ParseFailed(_)) => EXIT_USAGE,
        Err(e) => {
            tracing::error!("{e:#}");
            EXIT_FAILURE
        }
    };

    if shell::should_pause(config.pause) {
        shell::pause(&mut io::stdin().lock(), &mut io::stdout());
    }

    ExitCode::from(code)
}

fn run(command: Vec<String>, config: &HostConfig) -> Result<RunOutcome> {
    if config.set_title {
        shell::set_title(&host_title());
    }

    let command = if command.is_empty() {
        shell::prompt_command(&mut io::stdin().lock(), &mut io::stdout())?
    } else {
        command
    };

    let Some((module, args)) = command.split_first() else {
        bail!("No tool path given");
    };

    // Tools loaded as shared libraries read their filter from here.
    std::env::set_var(LOG_ENV, &config.log_level);

    tracing::info!(module = %module, bind = %config.bind, "Running tool");

    let set_title = config.set_title;
    let mut session = Session::new(ModuleLoader::global(), call_site(config.bind)?, io::stdout())
        .on_title(move |title| {
            if set_title {
                shell::set_title(title);
            }
        });

    let outcome = session.run(module, args)?;
    tracing::debug!(?outcome, "Run finished");

    Ok(outcome)
}

fn host_title() -> String {
    format!(
        "{} v{} by {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_AUTHORS").replace(':', ", ")
    )
}

#[cfg(all(
    feature = "code-patch",
    unix,
    any(target_arch = "x86", target_arch = "x86_64")
))]
fn call_site(mode: BindMode) -> Result<&'static dyn CallSite> {
    Ok(match mode {
        BindMode::Slot => DispatchSlot::global(),
        BindMode::Patch => toolhost_loader::PatchedStub::global(),
    })
}

#[cfg(not(all(
    feature = "code-patch",
    unix,
    any(target_arch = "x86", target_arch = "x86_64")
)))]
fn call_site(mode: BindMode) -> Result<&'static dyn CallSite> {
    match mode {
        BindMode::Slot => Ok(DispatchSlot::global()),
        BindMode::Patch => {
            bail!("Patch binding needs the code-patch feature on unix x86/x86_64")
        }
    }
}

fn init_tracing(filter: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .with_context(|| format!("Invalid log filter '{filter}'"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(filter)
        .init();

    Ok(())
}
