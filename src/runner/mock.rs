//! Mock runner for testing and offline demos.
//!
//! Answers with canned SQL*Plus-shaped output instead of spawning anything.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::process::{has_error_marker, timeout_message, truncation_notice};
use super::{ExecutionFailure, ExecutionRequest, ExecutionResult, HealthStatus, ScriptRunner};

const TABLE_OUTPUT: &str = "\
NOME                 IDADE
-------------------- -----
Joao                    25
Maria                   31

2 rows selected.

Elapsed: 00:00:00.01
";

const PLAN_OUTPUT: &str = "\
PLAN_TABLE_OUTPUT
--------------------------------------------------------------------------------
Plan hash value: 3046894458

------------------------------------------------------------------------------
| Id  | Operation         | Name     | Rows  | Bytes | Cost (%CPU)| Time     |
------------------------------------------------------------------------------
|   0 | SELECT STATEMENT  |          |  5000 |   380K|   137   (1)| 00:00:01 |
|*  1 |  TABLE ACCESS FULL| CLIENTES |  5000 |   380K|   137   (1)| 00:00:01 |
------------------------------------------------------------------------------

Predicate Information (identified by operation id):
---------------------------------------------------

   1 - filter(\"ESTADO\"='SP')

13 rows selected.
";

/// What the mock does with each request.
#[derive(Debug, Clone)]
enum Behavior {
    /// Plan text for DBMS_XPLAN scripts, a small table otherwise.
    Canned,
    /// Always print this text; fail on error markers like the real client.
    Fixed(String),
    /// Report a timeout after sleeping for the request's budget.
    Hang,
    /// Panic inside `execute`.
    Panic,
}

/// A runner that never leaves the process.
#[derive(Debug)]
pub struct MockRunner {
    behavior: Behavior,
    health: HealthStatus,
    executed: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            behavior: Behavior::Canned,
            health: HealthStatus::ready(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `output`.
    pub fn with_output(output: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fixed(output.into()),
            ..Self::new()
        }
    }

    /// Every run times out.
    pub fn hanging() -> Self {
        Self {
            behavior: Behavior::Hang,
            ..Self::new()
        }
    }

    /// Every run panics.
    pub fn panicking() -> Self {
        Self {
            behavior: Behavior::Panic,
            ..Self::new()
        }
    }

    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    /// Scripts received so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptRunner for MockRunner {
    async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        self.executed.lock().push(request.script.clone());

        let output = match &self.behavior {
            Behavior::Canned if request.script.to_uppercase().contains("DBMS_XPLAN") => {
                PLAN_OUTPUT.to_string()
            }
            Behavior::Canned => TABLE_OUTPUT.to_string(),
            Behavior::Fixed(text) => text.clone(),
            Behavior::Hang => {
                tokio::time::sleep(request.timeout).await;
                return ExecutionResult::failure(
                    timeout_message(request.timeout),
                    request.timeout.as_millis() as u64,
                    ExecutionFailure::Timeout,
                );
            }
            Behavior::Panic => panic!("mock runner configured to panic"),
        };

        let truncated = output.len() > request.max_output_bytes;
        let mut text = if truncated {
            let mut end = request.max_output_bytes;
            while !output.is_char_boundary(end) {
                end -= 1;
            }
            output[..end].to_string()
        } else {
            output
        };
        let failed = has_error_marker(&text);
        if truncated {
            text.push_str(&truncation_notice(request.max_output_bytes));
        }

        ExecutionResult {
            text,
            succeeded: !failed,
            elapsed_ms: 1,
            truncated,
            failure: failed.then_some(ExecutionFailure::RemoteContent),
        }
    }

    async fn health(&self) -> HealthStatus {
        self.health
    }
}
