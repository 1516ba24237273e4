//! End-to-end runs through the real process pipeline.
//!
//! A shell script stands in for `docker`: it answers `inspect` with the
//! container state and `exec` by reading the script from stdin and printing
//! SQL*Plus-shaped output.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use tuning_lab::config::{Config, DatabaseConfig};
use tuning_lab::runner::{ExecutionFailure, ExecutionRequest, ScriptRunner, SqlPlusRunner};

use super::TestServer;

const FAKE_DOCKER: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$(dirname "$0")/args.log"
case "$1" in
  inspect)
    echo "$FAKE_STATE"
    ;;
  exec)
    input=$(cat)
    printf '%s\n' "$input" > "$(dirname "$0")/stdin.log"
    case "$input" in
      *sleepy*)
        exec sleep 10
        ;;
      *nope*)
        printf 'SELECT * FROM nope\n              *\nERROR at line 1:\nORA-00942: table or view does not exist\n'
        ;;
      *DUAL*)
        printf '\n         1\n'
        ;;
      *)
        printf 'NOME  IDADE\n----  -----\nJoao  25\n\n1 row selected.\n\nElapsed: 00:00:00.01\n'
        ;;
    esac
    ;;
esac
"#;

struct FakeDocker {
    dir: TempDir,
    program: PathBuf,
}

impl FakeDocker {
    fn install(container_state: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("docker");
        let script = FAKE_DOCKER.replace("$FAKE_STATE", container_state);
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, program }
    }

    fn config(&self) -> Config {
        let mut config = Config {
            database: DatabaseConfig {
                user: Some("tuning_lab".to_string()),
                password: Some("tuning123".to_string()),
                service: Some("FREEPDB1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        config.runner.docker = self.program.display().to_string();
        config.runner.timeout_ms = 2_000;
        config.runner.inspect_timeout_ms = 2_000;
        config.runner.probe_timeout_ms = 2_000;
        config
    }

    fn log(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn runner(config: &Config) -> SqlPlusRunner {
    SqlPlusRunner::from_config(config).unwrap()
}

#[tokio::test]
async fn test_script_reaches_client_wrapped() {
    let docker = FakeDocker::install("true");
    let config = docker.config();

    let result = runner(&config)
        .execute(ExecutionRequest::from_config(
            "SELECT nome, idade FROM clientes;",
            &config.runner,
        ))
        .await;

    assert!(result.succeeded, "{}", result.text);
    assert!(result.text.contains("1 row selected."));

    let args: Vec<String> = docker.log("args.log").lines().map(String::from).collect();
    assert_eq!(
        args,
        vec![
            "exec",
            "-i",
            "oracle-tuning-lab",
            "sqlplus",
            "-S",
            "tuning_lab/tuning123@//localhost:1521/FREEPDB1"
        ]
    );

    let stdin = docker.log("stdin.log");
    assert!(stdin.starts_with("SET LINESIZE 200\n"));
    assert!(stdin.contains("SELECT nome, idade FROM clientes;\n"));
    assert!(stdin.trim_end().ends_with("EXIT;"));
}

#[tokio::test]
async fn test_database_error_through_api() {
    let docker = FakeDocker::install("true");
    let config = docker.config();
    let server = TestServer::start(&config, Arc::new(runner(&config))).await;

    let response = reqwest::Client::new()
        .post(server.url("/api/execute"))
        .json(&json!({"sql": "SELECT * FROM nope;"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["blocks"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["blocks"][0]["type"], json!("text"));
    assert!(body["output"].as_str().unwrap().contains("ORA-00942"));

    server.stop().await;
}

#[tokio::test]
async fn test_table_through_api() {
    let docker = FakeDocker::install("true");
    let config = docker.config();
    let server = TestServer::start(&config, Arc::new(runner(&config))).await;

    let response = reqwest::Client::new()
        .post(server.url("/api/execute"))
        .json(&json!({"sql": "SELECT nome, idade FROM clientes;"}))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(
        body["blocks"][0],
        json!({
            "type": "table",
            "headers": ["NOME", "IDADE"],
            "rows": [["Joao", "25"]],
            "footer": "1 row selected."
        })
    );

    server.stop().await;
}

#[tokio::test]
async fn test_slow_client_is_killed() {
    let docker = FakeDocker::install("true");
    let mut config = docker.config();
    config.runner.timeout_ms = 300;

    let started = std::time::Instant::now();
    let result = runner(&config)
        .execute(ExecutionRequest::from_config(
            "SELECT 'sleepy' FROM dual;",
            &config.runner,
        ))
        .await;

    assert_eq!(result.failure, Some(ExecutionFailure::Timeout));
    assert_eq!(result.text, "Query timed out (0.3s limit exceeded)");
    assert!(started.elapsed() < std::time::Duration::from_secs(3));
}

#[tokio::test]
async fn test_health_through_api() {
    let docker = FakeDocker::install("true");
    let config = docker.config();
    let server = TestServer::start(&config, Arc::new(runner(&config))).await;

    let body: Value = reqwest::get(server.url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"containerRunning": true, "oracleReady": true}));

    server.stop().await;
}

#[tokio::test]
async fn test_stopped_container_is_not_ready() {
    let docker = FakeDocker::install("false");
    let config = docker.config();

    let status = runner(&config).health().await;

    assert!(!status.container_running);
    assert!(!status.oracle_ready);
    // Only the inspect call ran
    assert!(docker.log("args.log").starts_with("inspect\n"));
    assert!(!docker.path("stdin.log").exists());
}
