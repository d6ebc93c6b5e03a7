//! External command invocation shared by the command-backed adapters.

use crate::errors::ServiceUnavailable;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A program and its argument template.
///
/// Arguments may contain `{name}` placeholders, filled in per item by
/// [`render`](Self::render).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    /// Argument templates.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Creates a spec with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends one argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Returns the arguments with every `{name}` replaced by its value.
    #[must_use]
    pub fn render(&self, vars: &[(&str, &str)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (name, value)| {
                    acc.replace(&format!("{{{name}}}"), value)
                })
            })
            .collect()
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns the last non-blank stdout line.
    #[must_use]
    pub fn last_line(&self) -> Option<&str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last()
    }
}

/// Runs `spec` with `vars` substituted and `envs` added to the environment.
///
/// The child is killed if the returned future is dropped, so callers can
/// bound it with a timeout.
///
/// # Errors
///
/// Fails if the program exits unsuccessfully, with the trimmed stderr in the
/// message. A program that cannot be started fails with
/// [`ServiceUnavailable`] in the chain.
pub async fn run_command(
    spec: &CommandSpec,
    vars: &[(&str, &str)],
    envs: &[(&str, &str)],
) -> anyhow::Result<CommandOutput> {
    let args = spec.render(vars);
    debug!(program = %spec.program, ?args, "running command");

    let output = Command::new(&spec.program)
        .args(&args)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|err| anyhow::Error::new(ServiceUnavailable::new(&spec.program, err)))
        .with_context(|| format!("failed to start {}", spec.program))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map_or_else(|| "a signal".to_string(), |c| format!("exit code {c}"));
        bail!("{} failed with {}: {}", spec.program, code, stderr.trim());
    }

    Ok(CommandOutput { stdout, stderr })
}
