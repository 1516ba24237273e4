//! HTTP API tests against the mock runner.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use tuning_lab::config::Config;
use tuning_lab::runner::{HealthStatus, MockRunner};

use super::TestServer;

async fn post_execute(
    client: &reqwest::Client,
    server: &TestServer,
    forwarded_for: &str,
    body: Value,
) -> (StatusCode, Value) {
    let response = client
        .post(server.url("/api/execute"))
        .header("x-forwarded-for", forwarded_for)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let runner = MockRunner::new().with_health(HealthStatus {
        container_running: true,
        oracle_ready: false,
    });
    let server = TestServer::start(&Config::default(), Arc::new(runner)).await;

    let response = reqwest::get(server.url("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"containerRunning": true, "oracleReady": false}));

    server.stop().await;
}

#[tokio::test]
async fn test_execute_returns_parsed_table() {
    let runner = Arc::new(MockRunner::new());
    let server = TestServer::start(&Config::default(), runner.clone()).await;
    let client = reqwest::Client::new();

    let (status, body) = post_execute(
        &client,
        &server,
        "203.0.113.1",
        json!({"sql": "SELECT nome, idade FROM clientes;"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["executionTime"], json!(1));
    assert_eq!(
        body["blocks"][0],
        json!({
            "type": "table",
            "headers": ["NOME", "IDADE"],
            "rows": [["Joao", "25"], ["Maria", "31"]],
            "footer": "2 rows selected."
        })
    );
    assert_eq!(body["blocks"][1]["content"], json!("Elapsed: 00:00:00.01"));
    assert!(body.get("plan").is_none());
    assert_eq!(runner.executed().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_plan_output_stays_text_with_highlights() {
    let server = TestServer::start(&Config::default(), Arc::new(MockRunner::new())).await;
    let client = reqwest::Client::new();

    let (status, body) = post_execute(
        &client,
        &server,
        "203.0.113.2",
        json!({"sql": "EXPLAIN PLAN FOR SELECT * FROM clientes WHERE estado = 'SP';\nSELECT * FROM TABLE(DBMS_XPLAN.DISPLAY);"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let blocks = body["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0]["type"], json!("text"));
    assert_eq!(body["highlighted"][0]["category"], json!("full-table-scan"));
    assert_eq!(body["plan"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["plan"][1]["hasPredicate"], json!(true));

    server.stop().await;
}

#[tokio::test]
async fn test_rejections_use_status_codes() {
    let runner = Arc::new(MockRunner::new());
    let server = TestServer::start(&Config::default(), runner.clone()).await;
    let client = reqwest::Client::new();

    let (status, body) = post_execute(&client, &server, "198.51.100.1", json!({"sql": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["output"], json!("No SQL provided"));

    let (status, body) =
        post_execute(&client, &server, "198.51.100.2", json!({"sql": "   \n  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["output"], json!("No SQL provided"));

    let (status, body) = post_execute(
        &client,
        &server,
        "198.51.100.3",
        json!({"sql": "UPDATE clientes SET status = 'X';"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["executionTime"], json!(0));
    assert_eq!(body["blocks"], json!([]));

    let (status, body) = post_execute(
        &client,
        &server,
        "198.51.100.4",
        json!({"sql": "X".repeat(10_001)}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["output"], json!("SQL too long (max 10000 chars)"));

    assert!(runner.executed().is_empty());
    server.stop().await;
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let server = TestServer::start(&Config::default(), Arc::new(MockRunner::new())).await;

    let response = reqwest::Client::new()
        .post(server.url("/api/execute"))
        .header("content-type", "application/json")
        .body("{\"sql\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["output"], json!("Invalid JSON body"));

    server.stop().await;
}

#[tokio::test]
async fn test_rate_limit_keys_on_peer_address() {
    let server = TestServer::start(&Config::default(), Arc::new(MockRunner::new())).await;
    let client = reqwest::Client::new();
    let send = || {
        client
            .post(server.url("/api/execute"))
            .json(&json!({"sql": "SELECT 1 FROM dual"}))
            .send()
    };

    let first = send().await.unwrap();
    let second = send().await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["output"], json!("Rate limited. Please wait 1 second."));

    server.stop().await;
}

#[tokio::test]
async fn test_clients_are_limited_independently() {
    let server = TestServer::start(&Config::default(), Arc::new(MockRunner::new())).await;
    let client = reqwest::Client::new();
    let sql = json!({"sql": "SELECT 1 FROM dual"});

    let (a, _) = post_execute(&client, &server, "192.0.2.10", sql.clone()).await;
    let (b, _) = post_execute(&client, &server, "192.0.2.11", sql.clone()).await;
    let (a_again, _) = post_execute(&client, &server, "192.0.2.10", sql).await;

    assert_eq!(a, StatusCode::OK);
    assert_eq!(b, StatusCode::OK);
    assert_eq!(a_again, StatusCode::TOO_MANY_REQUESTS);

    server.stop().await;
}

#[tokio::test]
async fn test_short_cooldown_allows_retry() {
    let mut config = Config::default();
    config.rate_limit.cooldown_ms = 50;
    let server = TestServer::start(&config, Arc::new(MockRunner::new())).await;
    let client = reqwest::Client::new();
    let sql = json!({"sql": "SELECT 1 FROM dual"});

    let (first, _) = post_execute(&client, &server, "192.0.2.20", sql.clone()).await;
    tokio::time::sleep(std::time::Duration::from_millis(80)).await;
    let (second, _) = post_execute(&client, &server, "192.0.2.20", sql).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_timeout_is_reported_in_body() {
    let mut config = Config::default();
    config.runner.timeout_ms = 200;
    let server = TestServer::start(&config, Arc::new(MockRunner::hanging())).await;
    let client = reqwest::Client::new();

    let (status, body) = post_execute(
        &client,
        &server,
        "192.0.2.30",
        json!({"sql": "SELECT COUNT(*) FROM pedidos;"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["output"], json!("Query timed out (0.2s limit exceeded)"));

    server.stop().await;
}

#[tokio::test]
async fn test_runner_panic_is_internal_error() {
    let server = TestServer::start(&Config::default(), Arc::new(MockRunner::panicking())).await;
    let client = reqwest::Client::new();

    let (status, body) =
        post_execute(&client, &server, "192.0.2.40", json!({"sql": "SELECT 1 FROM dual"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["output"], json!("Internal server error"));

    // The server keeps answering after a failed task
    let health = reqwest::get(server.url("/api/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    server.stop().await;
}
