//! Subprocess execution for the Job Runner.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self { program: program.into(), args: args.iter().map(|a| (*a).to_string()).collect() }
    }

    /// Splits a command line on whitespace. Returns `None` for a blank line.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self { program, args: parts.collect() })
    }

    /// `pip install -r requirements.txt`
    #[must_use]
    pub fn default_install() -> Self {
        Self::new("pip", &["install", "-r", super::REQUIREMENTS_FILE])
    }

    /// `python <script>`
    #[must_use]
    pub fn python(script: &str) -> Self {
        Self::new("python", &[script])
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a subprocess ended. `code` is `None` when it was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub code: Option<i32>,
}

impl ExitOutcome {
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl std::fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Runs a command to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Spawns `command` in `cwd` with `env` added to the inherited environment and waits
    /// for it to exit.
    ///
    /// # Errors
    /// Returns error if the process cannot be spawned or waited on
    async fn run(
        &self,
        command: &CommandSpec,
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> std::io::Result<ExitOutcome>;
}

/// Runs commands as child processes with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> std::io::Result<ExitOutcome> {
        debug!(command = %command, cwd = %cwd.display(), "Spawning process");
        let mut child =
            Command::new(&command.program).args(&command.args).current_dir(cwd).envs(env).kill_on_drop(true).spawn()?;
        let status = child.wait().await?;
        Ok(ExitOutcome { code: status.code() })
    }
}
