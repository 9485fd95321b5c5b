//! Typed external-tool invocations.
//!
//! Every call the publisher makes to `git`, `gh`, `gpg`, or the packager is
//! described by a [`ToolCommand`] and handed to a [`CommandExecutor`]. The
//! adapters never build a `std::process::Command` themselves, which keeps the
//! exact argv of each invocation observable in tests.

use crate::error::{PublisherError, Result};
use camino::Utf8PathBuf;
use log::debug;
use std::fmt;
use std::io::Write;
use std::process::{Command, Output, Stdio};

/// A single external-tool invocation.
///
/// # Examples
///
/// ```
/// use release_publisher::command::ToolCommand;
///
/// let command = ToolCommand::new("gh")
///     .args(["release", "view", "v1.0.0"])
///     .env("GH_PROMPT_DISABLED", "1");
/// assert_eq!(command.program(), "gh");
/// assert_eq!(command.to_string(), "gh release view v1.0.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdin: Option<Vec<u8>>,
    current_dir: Option<Utf8PathBuf>,
}

impl ToolCommand {
    /// Start a command for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
            current_dir: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Bytes written to the child's stdin before waiting for it.
    #[must_use]
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Working directory for the child process.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// The program to run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments, in order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Extra environment variables for the child.
    #[must_use]
    pub fn environment(&self) -> &[(String, String)] {
        &self.env
    }

    /// Bytes piped to stdin, if any.
    #[must_use]
    pub fn stdin_bytes(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    /// Working directory override, if any.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8PathBuf> {
        self.current_dir.as_ref()
    }
}

impl fmt::Display for ToolCommand {
    /// Renders program and arguments only; stdin and environment values may
    /// carry secrets and are never shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs the command to completion and returns its captured output.
    ///
    /// A non-zero exit status is not an error at this level; adapters
    /// decide what a failure means for their collaborator.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while spawning the process or feeding
    /// its stdin.
    fn execute(&self, command: &ToolCommand) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &ToolCommand) -> Result<Output> {
        debug!("running {command}");

        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in command.environment() {
            cmd.env(key, value);
        }
        if let Some(dir) = command.working_dir() {
            cmd.current_dir(dir.as_std_path());
        }

        let Some(input) = command.stdin_bytes() else {
            return cmd
                .stdin(Stdio::null())
                .output()
                .map_err(PublisherError::from);
        };

        let mut child = cmd.stdin(Stdio::piped()).spawn()?;
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input)?;
            // Dropping the handle closes the pipe so the child sees EOF.
        }
        child.wait_with_output().map_err(PublisherError::from)
    }
}

/// Returns the trimmed stderr of a failed command, falling back to the exit
/// status when the tool printed nothing.
#[must_use]
pub fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        format!("exited with {}", output.status)
    } else {
        trimmed.to_owned()
    }
}

/// Returns stdout decoded as UTF-8, replacing invalid sequences.
#[must_use]
pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
