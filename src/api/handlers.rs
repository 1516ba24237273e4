//! Endpoint handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::{error, info, warn};

use super::types::{ExecuteRequest, ExecuteResponse};
use super::AppState;
use crate::error::{LabError, Result};
use crate::ratelimit::client_key;
use crate::runner::{ExecutionRequest, HealthStatus};

/// `POST /api/execute`
///
/// Throttle, validate, check policy, then run. Nothing is spawned for a
/// request that fails any of the first three steps.
pub async fn execute(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: std::result::Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>> {
    let client = client_key(&headers, connect.map(|ConnectInfo(addr)| addr));

    if !state.limiter.allow(&client) {
        warn!(client = %client, "Rate limited");
        return Err(LabError::RateLimited(state.limiter.retry_hint()));
    }

    let Json(request) = body.map_err(|e| {
        warn!(client = %client, "Rejected request body: {}", e);
        LabError::input("Invalid JSON body")
    })?;

    let script = request
        .script()
        .ok_or_else(|| LabError::input("No SQL provided"))?;

    let max_chars = state.policy.max_script_chars();
    if script.chars().count() > max_chars {
        return Err(LabError::input(format!(
            "SQL too long (max {max_chars} chars)"
        )));
    }

    let verdict = state.policy.evaluate(script);
    if !verdict.safe {
        warn!(client = %client, category = ?verdict.category, "Blocked: {}", verdict.reason());
        return Err(LabError::policy(verdict.reason()));
    }

    let runner = Arc::clone(&state.runner);
    let request = ExecutionRequest::from_config(script, &state.runner_config);
    let result = tokio::spawn(async move { runner.execute(request).await })
        .await
        .map_err(|e| {
            error!(client = %client, "Execution task failed: {}", e);
            LabError::internal(e.to_string())
        })?;

    info!(
        client = %client,
        elapsed_ms = result.elapsed_ms,
        success = result.succeeded,
        "Execute request completed"
    );
    Ok(Json(ExecuteResponse::from_result(result)))
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let runner = Arc::clone(&state.runner);
    match tokio::spawn(async move { runner.health().await }).await {
        Ok(status) => (StatusCode::OK, Json(status)),
        Err(e) => {
            error!("Health check task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(HealthStatus::down()))
        }
    }
}
