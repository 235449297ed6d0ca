//! Subprocess execution for collaborator commands.

use crate::bundler::error::{Error, Result};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};
use tokio::process::Command;

/// A command line, kept as data so it can be logged and tested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program to run
    pub program: PathBuf,
    /// Arguments in order
    pub args: Vec<OsString>,
    /// Extra environment variables
    pub envs: Vec<(String, String)>,
}

impl CommandLine {
    /// Creates a command line for `program` with no arguments.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Returns the arguments as lossy strings, for assertions and messages.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    /// Exit status
    pub status: ExitStatus,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl CommandOutput {
    /// Returns a short description of the exit status.
    pub fn status_description(&self) -> String {
        match self.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "termination by signal".to_string(),
        }
    }
}

/// Runs the command to completion and captures its output.
///
/// A non-zero exit is not an error here; callers classify failures for their
/// own stage. The child is killed if the returned future is dropped, so a
/// stage timeout never leaves the collaborator running.
pub async fn run(command: &CommandLine) -> Result<CommandOutput> {
    log::debug!("Running: {}", command);

    let output = Command::new(&command.program)
        .args(&command.args)
        .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: command.to_string(),
            error,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    for line in stdout.lines() {
        log::debug!("  {}", line);
    }
    if !output.status.success() {
        log::debug!("`{}` failed with {:?}", command, output.status.code());
    }

    Ok(CommandOutput {
        status: output.status,
        stdout,
        stderr,
    })
}
