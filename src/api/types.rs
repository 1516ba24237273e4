//! Request and response bodies.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::LabError;
use crate::output::{highlight, plan_steps, structure, HighlightedLine, LineCategory, ParsedBlock, PlanStep};
use crate::runner::ExecutionResult;

/// Body of `POST /api/execute`.
///
/// `sql` stays loosely typed so a missing or non-string value gets the same
/// answer as an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub sql: Option<serde_json::Value>,
}

impl ExecuteRequest {
    /// The submitted script, if it is a string with something besides blanks.
    pub fn script(&self) -> Option<&str> {
        self.sql
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .filter(|sql| !sql.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub output: String,
    pub success: bool,
    /// Milliseconds spent in the SQL client; 0 when nothing ran.
    pub execution_time: u64,
    pub blocks: Vec<ParsedBlock>,
    /// Lines worth drawing attention to; plain lines are left out.
    pub highlighted: Vec<HighlightedLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlanStep>>,
}

impl ExecuteResponse {
    /// Body for a request that was turned away before anything ran.
    pub fn rejected(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
            execution_time: 0,
            blocks: Vec::new(),
            highlighted: Vec::new(),
            plan: None,
        }
    }

    pub fn from_result(result: ExecutionResult) -> Self {
        let blocks = structure(&result.text, result.succeeded);
        let highlighted = highlight(&result.text)
            .into_iter()
            .filter(|line| line.category != LineCategory::Plain)
            .collect();
        let plan = Some(plan_steps(&result.text)).filter(|steps| !steps.is_empty());

        Self {
            output: result.text,
            success: result.succeeded,
            execution_time: result.elapsed_ms,
            blocks,
            highlighted,
            plan,
        }
    }
}

impl IntoResponse for LabError {
    fn into_response(self) -> Response {
        (self.status(), Json(ExecuteResponse::rejected(self.client_message()))).into_response()
    }
}
