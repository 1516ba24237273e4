//! One-shot CLI commands: `check`, `run` and `health`.
//!
//! Each command writes its report to the given writer and returns whether it
//! succeeded, so the binary can pick an exit code and tests can capture output.

mod render;

pub use render::{paint_line, render_blocks};

use std::io::{Read, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::error::{LabError, Result};
use crate::output::structure;
use crate::runner::{ExecutionRequest, ScriptRunner};
use crate::safety::PolicyEngine;

/// Reads a script from a file, or from stdin when `source` is `-`.
pub fn read_script(source: &str) -> Result<String> {
    if source == "-" {
        let mut script = String::new();
        std::io::stdin().read_to_string(&mut script)?;
        return Ok(script);
    }
    std::fs::read_to_string(Path::new(source))
        .map_err(|e| LabError::input(format!("Cannot read script {source}: {e}")))
}

/// Prints the policy verdict for `script`.
pub fn check(policy: &PolicyEngine, script: &str, out: &mut impl Write) -> Result<bool> {
    let verdict = policy.evaluate(script);
    if verdict.safe {
        writeln!(out, "Allowed")?;
    } else {
        writeln!(out, "Blocked: {}", verdict.reason())?;
    }
    Ok(verdict.safe)
}

/// Checks `script`, runs it when allowed and prints the parsed output.
pub async fn run(
    policy: &PolicyEngine,
    runner: &dyn ScriptRunner,
    runner_config: &RunnerConfig,
    script: &str,
    color: bool,
    out: &mut impl Write,
) -> Result<bool> {
    if script.trim().is_empty() {
        writeln!(out, "No SQL provided")?;
        return Ok(false);
    }

    let verdict = policy.evaluate(script);
    if !verdict.safe {
        warn!(category = ?verdict.category, "Blocked: {}", verdict.reason());
        writeln!(out, "Blocked: {}", verdict.reason())?;
        return Ok(false);
    }

    let result = runner
        .execute(ExecutionRequest::from_config(script, runner_config))
        .await;
    info!(
        elapsed_ms = result.elapsed_ms,
        success = result.succeeded,
        "Script finished"
    );

    let blocks = structure(&result.text, result.succeeded);
    let rendered = render_blocks(&blocks, color);
    if !rendered.is_empty() {
        writeln!(out, "{rendered}")?;
    }
    writeln!(
        out,
        "\n{} in {} ms",
        if result.succeeded { "Succeeded" } else { "Failed" },
        result.elapsed_ms
    )?;
    Ok(result.succeeded)
}

/// Prints container and database readiness.
pub async fn health(runner: &dyn ScriptRunner, out: &mut impl Write) -> Result<bool> {
    let status = runner.health().await;
    writeln!(out, "container running: {}", status.container_running)?;
    writeln!(out, "oracle ready:      {}", status.oracle_ready)?;
    Ok(status.container_running && status.oracle_ready)
}
