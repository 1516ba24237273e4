//! Spawning the SQL client and bounding what it may cost.
//!
//! One run is a single future: write the script to stdin, drain stdout and
//! stderr, wait for exit. The whole future sits under one timeout. The child
//! handle is owned outside that future so it can be killed and reaped when
//! the budget runs out.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{CommandSpec, ExecutionFailure, ExecutionRequest, ExecutionResult};

/// Formatting directives sent ahead of every script.
const SESSION_DIRECTIVES: &[&str] = &[
    "SET LINESIZE 200",
    "SET PAGESIZE 50000",
    "SET TRIMOUT ON",
    "SET TRIMSPOOL ON",
    "SET FEEDBACK ON",
    "SET TIMING ON",
];

/// stderr is diagnostics only; keep a bounded amount of it.
const MAX_STDERR_BYTES: usize = 16 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// Lines the SQL client prints when a statement failed.
static ERROR_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(ORA-|SP2-|ERROR)").expect("error marker pattern is valid"));

/// Returns true when any line of `text` starts with an error marker.
pub fn has_error_marker(text: &str) -> bool {
    ERROR_MARKER.is_match(text)
}

/// Surrounds a script with the session directives and a final `EXIT;`.
pub fn wrap_script(script: &str) -> String {
    let mut wrapped = String::with_capacity(script.len() + 128);
    for directive in SESSION_DIRECTIVES {
        wrapped.push_str(directive);
        wrapped.push('\n');
    }
    wrapped.push_str(script);
    wrapped.push('\n');
    wrapped.push_str("EXIT;\n");
    wrapped
}

/// What happened to one external process.
#[derive(Debug)]
pub enum ProcessOutcome {
    Exited {
        status: ExitStatus,
        stdout: String,
        stderr: String,
        /// stdout went over the cap; the excess was read and discarded.
        truncated: bool,
    },
    TimedOut,
    /// Spawn or pipe failure.
    Failed(io::Error),
}

/// Runs `command`, feeding it `input`, under `timeout`.
///
/// At most `max_stdout_bytes` of stdout are kept. The child is killed and
/// reaped when the timeout fires, and killed on drop on every other path.
pub async fn run_process(
    command: &CommandSpec,
    input: &str,
    timeout: Duration,
    max_stdout_bytes: usize,
) -> ProcessOutcome {
    let mut child = match command
        .to_command()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return ProcessOutcome::Failed(e),
    };

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let run = async {
        let write = async {
            if let Some(mut stdin) = stdin {
                // A client that exits without reading its input closes the pipe
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!("stdin write ended early: {}", e);
                } else if let Err(e) = stdin.shutdown().await {
                    debug!("stdin close failed: {}", e);
                }
            }
        };

        let ((), out, err) = tokio::join!(
            write,
            read_capped(stdout, max_stdout_bytes),
            read_capped(stderr, MAX_STDERR_BYTES),
        );
        let (stdout, truncated) = out?;
        let (stderr, _) = err?;
        let status = child.wait().await?;

        Ok::<_, io::Error>(ProcessOutcome::Exited {
            status,
            stdout: decode(&stdout, truncated),
            stderr: decode(&stderr, false),
            truncated,
        })
    };

    let finished = tokio::time::timeout(timeout, run).await;
    match finished {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => ProcessOutcome::Failed(e),
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed out process: {}", e);
            }
            ProcessOutcome::TimedOut
        }
    }
}

/// Reads a pipe to the end, keeping at most `cap` bytes.
async fn read_capped<R>(reader: Option<R>, cap: usize) -> io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };

    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(kept.len());
        if n > room {
            kept.extend_from_slice(&chunk[..room]);
            truncated = true;
        } else {
            kept.extend_from_slice(&chunk[..n]);
        }
    }

    Ok((kept, truncated))
}

/// Decodes output as UTF-8, dropping a character split by the byte cap.
fn decode(bytes: &[u8], truncated: bool) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) if truncated && e.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Notice appended once to output cut at `max_output_bytes`.
pub(crate) fn truncation_notice(max_output_bytes: usize) -> String {
    format!(
        "\n\n... output truncated ({}KB limit) ...",
        max_output_bytes.div_ceil(1024)
    )
}

/// Text of a timed-out result.
pub(crate) fn timeout_message(timeout: Duration) -> String {
    format!("Query timed out ({} limit exceeded)", format_limit(timeout))
}

fn format_limit(timeout: Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{:.1}s", timeout.as_secs_f64())
    }
}

/// Runs wrapped scripts through the SQL client command.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    command: CommandSpec,
}

impl ProcessExecutor {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }

    /// Executes one request and classifies the outcome.
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let start = Instant::now();
        let input = wrap_script(&request.script);

        debug!(program = %self.command.program, bytes = input.len(), "Spawning SQL client");
        let outcome = run_process(
            &self.command,
            &input,
            request.timeout,
            request.max_output_bytes,
        )
        .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let result = classify(outcome, request, elapsed_ms);
        info!(
            elapsed_ms = result.elapsed_ms,
            succeeded = result.succeeded,
            truncated = result.truncated,
            failure = ?result.failure,
            "Script executed"
        );
        result
    }
}

fn classify(outcome: ProcessOutcome, request: &ExecutionRequest, elapsed_ms: u64) -> ExecutionResult {
    match outcome {
        ProcessOutcome::TimedOut => ExecutionResult::failure(
            timeout_message(request.timeout),
            elapsed_ms,
            ExecutionFailure::Timeout,
        ),
        ProcessOutcome::Failed(e) => ExecutionResult::failure(
            format!("Failed to run SQL client: {e}"),
            elapsed_ms,
            ExecutionFailure::Spawn,
        ),
        ProcessOutcome::Exited {
            status,
            stdout,
            stderr,
            truncated,
        } if !status.success() => {
            let text = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("SQL client exited with {status}"));
            ExecutionResult {
                truncated,
                ..ExecutionResult::failure(text, elapsed_ms, ExecutionFailure::ExitStatus(status.code()))
            }
        }
        ProcessOutcome::Exited {
            stdout, truncated, ..
        } => {
            let failed = has_error_marker(&stdout);
            let mut text = stdout;
            if truncated {
                text.push_str(&truncation_notice(request.max_output_bytes));
            }
            ExecutionResult {
                text,
                succeeded: !failed,
                elapsed_ms,
                truncated,
                failure: failed.then_some(ExecutionFailure::RemoteContent),
            }
        }
    }
}
