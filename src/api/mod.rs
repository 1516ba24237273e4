//! HTTP surface: `POST /api/execute` and `GET /api/health`.

mod handlers;
mod types;

pub use handlers::{execute, health};
pub use types::{ExecuteRequest, ExecuteResponse};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Config, RunnerConfig};
use crate::error::Result;
use crate::ratelimit::RateLimiter;
use crate::runner::ScriptRunner;
use crate::safety::PolicyEngine;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<dyn ScriptRunner>,
    pub policy: PolicyEngine,
    pub limiter: RateLimiter,
    pub runner_config: RunnerConfig,
}

impl AppState {
    pub fn new(config: &Config, runner: Arc<dyn ScriptRunner>) -> Self {
        Self {
            runner,
            policy: PolicyEngine::new(config.policy.max_script_chars),
            limiter: RateLimiter::new(&config.rate_limit),
            runner_config: config.runner.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/execute", post(execute))
        .route("/api/health", get(health))
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;

    info!("Server stopped");
    Ok(())
}
