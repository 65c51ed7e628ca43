//! External command execution.
//!
//! Helm, kustomize and pre-processing scripts are opaque processes: an
//! argument list in, an exit status out. [`CommandRunner`] is the seam that
//! lets tests record invocations instead of launching them.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, trace};

use crate::error::{CommandError, Result};

/// An external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Extra environment variables, merged over the current environment.
    pub envs: BTreeMap<String, String>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
    /// Whether the command changes anything (suppressed in dry-run).
    pub mutating: bool,
}

impl CommandSpec {
    /// Creates a mutating command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: BTreeMap::new(),
            cwd: None,
            mutating: true,
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds environment variables.
    #[must_use]
    pub fn envs(mut self, envs: &BTreeMap<String, String>) -> Self {
        self.envs
            .extend(envs.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Adds one environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Marks the command as read-only, so it also runs in dry-run.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.mutating = false;
        self
    }

    /// The full command line, for logs and errors.
    #[must_use]
    pub fn to_command_string(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_command_string())
    }
}

/// Output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code (0 = success).
    pub exit_code: i32,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Returns true if the command succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external commands.
#[async_trait]
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Runs the command to completion.
    ///
    /// A non-zero exit status is an error.
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a process runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let line = spec.to_command_string();
        debug!("Executing: {line}");
        trace!("Command environment: {:?}", spec.envs);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let output = command.output().await.map_err(|source| {
            error!("Failed to spawn {}: {source}", spec.program);
            CommandError::Spawn {
                command: line.clone(),
                source,
            }
        })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if !result.success() {
            error!("Command failed ({}): {line}", result.exit_code);
            return Err(CommandError::Failed {
                command: line,
                status: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            }
            .into());
        }

        for stdout_line in result.stdout.lines() {
            trace!("{stdout_line}");
        }
        Ok(result)
    }
}

/// Recording runner standing in for external processes in tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    type Handler = dyn Fn(&CommandSpec) -> Result<CommandOutput> + Send + Sync;

    /// Records every command and answers through a handler.
    pub(crate) struct RecordingRunner {
        calls: Mutex<Vec<CommandSpec>>,
        handler: Box<Handler>,
    }

    impl fmt::Debug for RecordingRunner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("RecordingRunner").finish_non_exhaustive()
        }
    }

    impl RecordingRunner {
        /// Every command succeeds with empty output.
        pub(crate) fn succeeding() -> Self {
            Self::with_handler(|_| Ok(CommandOutput::default()))
        }

        pub(crate) fn with_handler(
            handler: impl Fn(&CommandSpec) -> Result<CommandOutput> + Send + Sync + 'static,
        ) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                handler: Box::new(handler),
            }
        }

        pub(crate) fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        /// Command lines, program included.
        pub(crate) fn lines(&self) -> Vec<String> {
            self.calls().iter().map(CommandSpec::to_command_string).collect()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(command.clone());
            }
            (self.handler)(command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let spec = CommandSpec::new("helm")
            .arg("repo")
            .args(["update"])
            .env("A", "1")
            .read_only();

        assert_eq!(spec.to_command_string(), "helm repo update");
        assert_eq!(spec.envs.get("A").map(String::as_str), Some("1"));
        assert!(!spec.mutating);
    }

    #[tokio::test]
    async fn test_process_runner_success() {
        let output = ProcessRunner::new()
            .run(&CommandSpec::new("sh").args(["-c", "echo $GREETING"]).env("GREETING", "hello"))
            .await
            .expect("sh must run");
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_process_runner_failure() {
        let err = ProcessRunner::new()
            .run(&CommandSpec::new("sh").args(["-c", "echo nope >&2; exit 3"]))
            .await
            .expect_err("exit 3 must fail");
        assert!(err.is_command_failure());
        assert!(err.to_string().contains("status 3"));
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_process_runner_missing_program() {
        let err = ProcessRunner::new()
            .run(&CommandSpec::new("/nonexistent/noops-binary"))
            .await
            .expect_err("spawn must fail");
        assert!(matches!(
            err,
            crate::error::NoopsError::Command(CommandError::Spawn { .. })
        ));
    }
}
