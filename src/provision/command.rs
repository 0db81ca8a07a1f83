//! Shell commands used for provisioning and the runner that executes or
//! prints them.
//!
//! Commands are run directly with their argument vector, never through a
//! shell, so paths with spaces need no escaping at run time. [`ShellCommand`]'s
//! `Display` output is still shell-quoted so that a dry-run transcript can be
//! pasted into a terminal as-is.

use crate::core::UpdaterError;
use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
}

impl ShellCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `rm -rf <paths>`
    pub fn rm_rf<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self::new("rm", ["-rf".to_string()].into_iter().chain(paths.into_iter().map(path_arg)))
    }

    /// `cp -R <from> <to>`
    pub fn cp_r(from: &Path, to: &Path) -> Self {
        Self::new("cp", ["-R".to_string(), path_arg(from), path_arg(to)])
    }

    /// `ln -s <target> <link>`
    pub fn ln_s(target: &Path, link: &Path) -> Self {
        Self::new("ln", ["-s".to_string(), path_arg(target), path_arg(link)])
    }

    /// `mv <from> <to>`
    pub fn mv(from: &Path, to: &Path) -> Self {
        Self::new("mv", [path_arg(from), path_arg(to)])
    }

    /// `mkdir -p <dir>`
    pub fn mkdir_p(dir: &Path) -> Self {
        Self::new("mkdir", ["-p".to_string(), path_arg(dir)])
    }

    /// `rmdir <dir>`
    pub fn rmdir(dir: &Path) -> Self {
        Self::new("rmdir", [path_arg(dir)])
    }

    /// `chown -R <owner> <paths>`
    pub fn chown_r<P: AsRef<Path>>(owner: &str, paths: impl IntoIterator<Item = P>) -> Self {
        Self::new(
            "chown",
            ["-R".to_string(), owner.to_string()].into_iter().chain(paths.into_iter().map(path_arg)),
        )
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

fn path_arg<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().display().to_string()
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@%+=,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Executes provisioning commands, or only prints them in a dry run.
#[derive(Debug)]
pub enum CommandRunner {
    /// Run each command, failing on a non-zero exit or after `timeout`.
    Live {
        timeout: Duration,
    },
    /// Print each command line to stdout and record it.
    DryRun {
        transcript: Vec<String>,
    },
}

impl CommandRunner {
    #[must_use]
    pub const fn live(timeout: Duration) -> Self {
        Self::Live {
            timeout,
        }
    }

    #[must_use]
    pub const fn dry_run() -> Self {
        Self::DryRun {
            transcript: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun { .. })
    }

    /// Command lines printed so far; always empty for a live runner.
    #[must_use]
    pub fn transcript(&self) -> &[String] {
        match self {
            Self::DryRun {
                transcript,
            } => transcript,
            Self::Live { .. } => &[],
        }
    }

    /// Runs `command`.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::CommandNotFound`] if the program is not on `PATH`
    /// - [`UpdaterError::CommandFailed`] on a non-zero exit or timeout
    pub async fn run(&mut self, command: &ShellCommand) -> Result<()> {
        match self {
            Self::DryRun {
                transcript,
            } => {
                let line = command.to_string();
                println!("{line}");
                transcript.push(line);
                Ok(())
            }
            Self::Live {
                timeout: limit,
            } => execute(command, *limit).await,
        }
    }

    /// Runs `commands` in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing command; later commands are skipped.
    pub async fn run_all(&mut self, commands: &[ShellCommand]) -> Result<()> {
        for command in commands {
            self.run(command).await?;
        }
        Ok(())
    }
}

async fn execute(command: &ShellCommand, limit: Duration) -> Result<()> {
    let program = which::which(command.program()).map_err(|_| UpdaterError::CommandNotFound {
        program: command.program().to_string(),
    })?;

    debug!("Executing command: {}", command);

    let mut cmd = Command::new(program);
    cmd.args(command.args()).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let output = match timeout(limit, cmd.output()).await {
        Ok(result) => result.with_context(|| format!("Failed to execute {command}"))?,
        Err(_) => {
            warn!("Command timed out after {} seconds: {}", limit.as_secs(), command);
            return Err(UpdaterError::CommandFailed {
                command: command.to_string(),
                status: format!("timed out after {}s", limit.as_secs()),
                stderr: String::new(),
            }
            .into());
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!("Command failed with exit code: {:?}", output.status.code());
        return Err(UpdaterError::CommandFailed {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr,
        }
        .into());
    }

    Ok(())
}
