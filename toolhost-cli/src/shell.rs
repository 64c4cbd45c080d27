//! Console integration: title, interactive prompt and exit pause

use anyhow::{bail, Context, Result};
use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use toolhost_config::PauseMode;

/// Set the terminal title when stdout is a terminal. Failures are ignored.
pub(crate) fn set_title(title: &str) {
    let mut stdout = io::stdout();
    if !stdout.is_terminal() {
        return;
    }
    let _ = stdout.write_all(title_sequence(title).as_bytes());
    let _ = stdout.flush();
}

/// OSC 0 sequence setting the window title
fn title_sequence(title: &str) -> String {
    let title: String = title.chars().filter(|c| !c.is_control()).collect();
    format!("\x1b]0;{title}\x07")
}

/// Ask for a tool path and its arguments, then split them like a shell would
pub(crate) fn prompt_command<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Vec<String>> {
    let path = prompt(input, output, "Specify tool path:")?;
    let args = prompt(input, output, "Specify arguments:")?;

    let line = format!("{} {}", path.trim(), args.trim());
    let command = shell_words::split(&line).context("Failed to split command line")?;
    if command.is_empty() {
        bail!("No tool path given");
    }

    Ok(command)
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    writeln!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Whether to wait for the user before exiting
pub(crate) fn should_pause(mode: PauseMode) -> bool {
    match mode {
        PauseMode::Always => true,
        PauseMode::Never => false,
        PauseMode::Auto => debugger_attached() || started_outside_shell(env::vars_os()),
    }
}

/// Wait for Enter
pub(crate) fn pause<R: BufRead, W: Write>(input: &mut R, output: &mut W) {
    let _ = writeln!(output, "Press any key to exit...");
    let _ = output.flush();
    let mut line = String::new();
    let _ = input.read_line(&mut line);
}

#[cfg(target_os = "linux")]
fn debugger_attached() -> bool {
    std::fs::read_to_string("/proc/self/status")
        .map(|status| tracer_attached(&status))
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn debugger_attached() -> bool {
    false
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn tracer_attached(status: &str) -> bool {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|pid| pid.trim().parse::<u32>().ok())
        .is_some_and(|pid| pid != 0)
}

/// Heuristic for a console opened just for this process (e.g. by
/// double-clicking the binary).
///
/// Never inside an IDE or a Unix shell; on Windows, `PROMPT` is only set by
/// an interactive `cmd`.
fn started_outside_shell<I, K, V>(vars: I) -> bool
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<std::ffi::OsStr>,
{
    let mut windir = false;
    let mut prompt = false;

    for (name, _) in vars {
        let name = name.as_ref().to_string_lossy().to_ascii_lowercase();
        match name.as_str() {
            "visualstudiodir" | "shell" => return false,
            "windir" => windir = true,
            "prompt" => prompt = true,
            _ => {}
        }
    }

    windir && !prompt
}
