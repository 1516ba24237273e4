//! Two-stage liveness and readiness check.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::process::{has_error_marker, run_process, ProcessOutcome};
use super::CommandSpec;
use crate::config::RunnerConfig;

/// Output kept from a probe; both probes print a handful of bytes.
const PROBE_OUTPUT_BYTES: usize = 4 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub container_running: bool,
    pub oracle_ready: bool,
}

impl HealthStatus {
    pub fn down() -> Self {
        Self::default()
    }

    pub fn ready() -> Self {
        Self {
            container_running: true,
            oracle_ready: true,
        }
    }
}

/// Checks the container first, then the database inside it.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    inspect: CommandSpec,
    client: CommandSpec,
    inspect_timeout: Duration,
    probe_timeout: Duration,
    probe_sql: String,
    probe_marker: String,
}

impl HealthProbe {
    pub fn new(inspect: CommandSpec, client: CommandSpec, config: &RunnerConfig) -> Self {
        Self {
            inspect,
            client,
            inspect_timeout: config.inspect_timeout(),
            probe_timeout: config.probe_timeout(),
            probe_sql: config.probe_sql.clone(),
            probe_marker: config.probe_marker.clone(),
        }
    }

    /// Runs both stages. The database is never queried when the container
    /// is not running.
    pub async fn check(&self) -> HealthStatus {
        if !self.container_running().await {
            return HealthStatus::down();
        }

        HealthStatus {
            container_running: true,
            oracle_ready: self.oracle_ready().await,
        }
    }

    async fn container_running(&self) -> bool {
        match run_process(&self.inspect, "", self.inspect_timeout, PROBE_OUTPUT_BYTES).await {
            ProcessOutcome::Exited { status, stdout, .. } => {
                status.success() && stdout.trim() == "true"
            }
            outcome => {
                debug!(?outcome, "Container inspection did not complete");
                false
            }
        }
    }

    async fn oracle_ready(&self) -> bool {
        let input = format!("{}\nEXIT;\n", self.probe_sql);
        match run_process(&self.client, &input, self.probe_timeout, PROBE_OUTPUT_BYTES).await {
            ProcessOutcome::Exited { status, stdout, .. } => {
                status.success()
                    && !has_error_marker(&stdout)
                    && stdout.contains(&self.probe_marker)
            }
            outcome => {
                debug!(?outcome, "Readiness probe did not complete");
                false
            }
        }
    }
}
