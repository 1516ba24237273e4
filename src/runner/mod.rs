//! Execution of permitted scripts in the external SQL client.
//!
//! Provides a trait-based interface so the HTTP layer and the CLI can run
//! against the real `docker exec … sqlplus` pipeline or an in-memory mock.

mod health;
mod mock;
mod process;

pub use health::{HealthProbe, HealthStatus};
pub use mock::MockRunner;
pub use process::{has_error_marker, run_process, wrap_script, ProcessExecutor, ProcessOutcome};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::{Config, RunnerConfig};
use crate::error::Result;

/// One accepted script, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub script: String,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl ExecutionRequest {
    /// Builds a request using the limits from the runner configuration.
    pub fn from_config(script: impl Into<String>, config: &RunnerConfig) -> Self {
        Self {
            script: script.into(),
            timeout: config.timeout(),
            max_output_bytes: config.max_output_bytes,
        }
    }
}

/// Why a run did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionFailure {
    /// The process outlived its time budget and was killed.
    Timeout,
    /// The process could not be started or its pipes failed.
    Spawn,
    /// The process exited with a non-zero status (code, if any).
    ExitStatus(Option<i32>),
    /// The process exited cleanly but its output carries an error marker.
    RemoteContent,
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Spawn => write!(f, "spawn"),
            Self::ExitStatus(Some(code)) => write!(f, "exit status {code}"),
            Self::ExitStatus(None) => write!(f, "terminated by signal"),
            Self::RemoteContent => write!(f, "database error"),
        }
    }
}

/// Outcome of one run. Always well-formed, whatever happened to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub text: String,
    pub succeeded: bool,
    pub elapsed_ms: u64,
    /// Output went over the byte cap and a notice was appended.
    pub truncated: bool,
    pub failure: Option<ExecutionFailure>,
}

impl ExecutionResult {
    pub fn success(text: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            text: text.into(),
            succeeded: true,
            elapsed_ms,
            truncated: false,
            failure: None,
        }
    }

    pub fn failure(text: impl Into<String>, elapsed_ms: u64, failure: ExecutionFailure) -> Self {
        Self {
            text: text.into(),
            succeeded: false,
            elapsed_ms,
            truncated: false,
            failure: Some(failure),
        }
    }
}

/// Trait defining the interface for script runners.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Runs an already permitted script. Never fails: process problems are
    /// reported on the result.
    async fn execute(&self, request: ExecutionRequest) -> ExecutionResult;

    /// Checks that the container is up and the database answers.
    async fn health(&self) -> HealthStatus;
}

/// Program and arguments for an external command.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
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

    /// `docker exec -i <container> sqlplus -S <connect>`.
    pub fn sql_client(runner: &RunnerConfig, connect: &str) -> Self {
        Self::new(
            runner.docker.as_str(),
            [
                "exec",
                "-i",
                runner.container.as_str(),
                runner.client.as_str(),
                "-S",
                connect,
            ],
        )
    }

    /// `docker inspect --format {{.State.Running}} <container>`.
    pub fn container_state(runner: &RunnerConfig) -> Self {
        Self::new(
            runner.docker.as_str(),
            [
                "inspect",
                "--format",
                "{{.State.Running}}",
                runner.container.as_str(),
            ],
        )
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

// Arguments carry the connect string, password included
impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args.len())
            .finish()
    }
}

/// Runner backed by `docker exec` and SQL*Plus.
#[derive(Debug)]
pub struct SqlPlusRunner {
    executor: ProcessExecutor,
    probe: HealthProbe,
}

impl SqlPlusRunner {
    pub fn new(executor: ProcessExecutor, probe: HealthProbe) -> Self {
        Self { executor, probe }
    }

    /// Builds the runner from configuration.
    ///
    /// Fails when the database account is incomplete.
    pub fn from_config(config: &Config) -> Result<Self> {
        let connect = config.database.connect_string()?;
        let client = CommandSpec::sql_client(&config.runner, &connect);
        let probe = HealthProbe::new(
            CommandSpec::container_state(&config.runner),
            client.clone(),
            &config.runner,
        );
        Ok(Self::new(ProcessExecutor::new(client), probe))
    }
}

#[async_trait]
impl ScriptRunner for SqlPlusRunner {
    async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        self.executor.execute(&request).await
    }

    async fn health(&self) -> HealthStatus {
        self.probe.check().await
    }
}
