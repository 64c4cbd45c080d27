//! Core tool trait and configuration contract

use clap::error::ErrorKind;
use clap::Parser;

/// Capability contract every loadable tool implements.
///
/// The associated [`Tool::Config`] type is the contract's single type
/// parameter: the host learns it only after the module is loaded and parses
/// the remaining process arguments into it.
///
/// Instances are created through [`Default`], so a tool must be
/// constructible without arguments.
pub trait Tool: Default + Send + 'static {
    /// Configuration parsed from the tool's command-line arguments
    type Config: ToolConfig;

    /// Display name, used as the terminal title while the tool runs.
    ///
    /// An empty title makes the host fall back to the module's product
    /// metadata.
    fn title(&self) -> &str {
        ""
    }

    /// Run the tool
    fn execute(&mut self, config: Self::Config);
}

/// Result of parsing tool arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult<T> {
    /// Arguments parsed into a configuration value
    Parsed(T),

    /// The user asked for usage text (`--help`, `--version`)
    ShowUsage,

    /// Arguments were rejected; carries a rendered diagnostic
    Failed(String),
}

impl<T> ParseResult<T> {
    /// Check if the arguments were parsed
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseResult::Parsed(_))
    }
}

/// Argument parser contract for tool configurations.
///
/// Implemented for every [`clap::Parser`] type, which is how tools are
/// expected to declare their options.
pub trait ToolConfig: Sized + Send + 'static {
    /// Parse `args` (without the program name). `bin_name` is shown in
    /// diagnostics and usage text.
    fn parse_args(bin_name: &str, args: &[String]) -> ParseResult<Self>;

    /// Render usage text
    fn usage_text(bin_name: &str) -> String;
}

impl<T> ToolConfig for T
where
    T: Parser + Send + 'static,
{
    fn parse_args(bin_name: &str, args: &[String]) -> ParseResult<Self> {
        let argv = std::iter::once(bin_name.to_owned()).chain(args.iter().cloned());
        match T::try_parse_from(argv) {
            Ok(config) => ParseResult::Parsed(config),
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => ParseResult::ShowUsage,
                _ => ParseResult::Failed(err.render().to_string()),
            },
        }
    }

    fn usage_text(bin_name: &str) -> String {
        let mut command = T::command().bin_name(bin_name.to_owned());
        command.render_help().to_string()
    }
}

/// Last path segment of a type name, e.g. `SampleTool` for
/// `sample_tool::SampleTool`.
pub fn short_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}
