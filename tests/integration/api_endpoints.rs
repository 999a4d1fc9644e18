//! HTTP API against a hub wired to a mocked exchange server
//!
//! Covers the response envelopes, the `400` answers for bad input and the
//! bearer token middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use market_sentinel::{
    Engine,
    api::{ApiConfig, ApiState, spawn_api_server},
    config::parse_config,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::MockServer;

use crate::helpers::{RecordingNotifier, mocked_registry, pair_json};

const TOKEN: &str = "test-token";

async fn spawn_test_api(server: &MockServer, auth_token: Option<&str>) -> (Engine, SocketAddr) {
    let config = parse_config(r#"{ "health_check": { "interval": 60 } }"#).unwrap();
    let engine = Engine::start(
        &config,
        mocked_registry(server),
        Arc::new(RecordingNotifier::default()),
        reqwest::Client::new(),
    );

    let api_config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        auth_token: auth_token.map(str::to_string),
        enable_cors: true,
    };
    let addr = spawn_api_server(api_config, ApiState::from_engine(&engine))
        .await
        .unwrap();
    (engine, addr)
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}/api/v1/{path}")
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = MockServer::start().await;
    let (engine, addr) = spawn_test_api(&server, None).await;

    let response = reqwest::get(url(addr, "health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let server = MockServer::start().await;
    let (engine, addr) = spawn_test_api(&server, None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(url(addr, "heartbeat"))
        .json(&json!({"name": "svc-A", "extra": {"pid": 42}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    let last = chrono::DateTime::parse_from_rfc3339(body["data"]["last_heartbeat"].as_str().unwrap())
        .unwrap();
    let next = chrono::DateTime::parse_from_rfc3339(body["data"]["next_check"].as_str().unwrap())
        .unwrap();
    assert_eq!((next - last).num_seconds(), 60);

    let listed: Value = client
        .get(url(addr, "heartbeats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["data"][0]["name"], "svc-A");
    assert_eq!(listed["data"][0]["state"], "healthy");

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_heartbeat_rejects_bad_input() {
    let server = MockServer::start().await;
    let (engine, addr) = spawn_test_api(&server, None).await;
    let client = reqwest::Client::new();

    let missing_name = client
        .post(url(addr, "heartbeat"))
        .json(&json!({"extra": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_name.status(), StatusCode::BAD_REQUEST);
    let body: Value = missing_name.json().await.unwrap();
    assert_eq!(body["error"], "name is required");

    let invalid_json = client
        .post(url(addr, "heartbeat"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(invalid_json.status(), StatusCode::BAD_REQUEST);
    let body: Value = invalid_json.json().await.unwrap();
    assert!(body["error"].is_string());

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pairs_registration_and_symbols() {
    let server = MockServer::start().await;
    let (engine, addr) = spawn_test_api(&server, None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(url(addr, "pairs"))
        .json(&json!([pair_json(("gate", "BTC_USDT"), ("Binance", "BTCUSDT"))]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["exchanges"]["gate"], json!(["BTC_USDT"]));
    assert_eq!(body["data"]["exchanges"]["binance"], json!(["BTCUSDT"]));

    let symbols: Value = client
        .get(url(addr, "symbols"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        symbols["data"],
        json!({"binance": ["BTCUSDT"], "gate": ["BTC_USDT"]})
    );

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pairs_with_unknown_exchange_are_rejected() {
    let server = MockServer::start().await;
    let (engine, addr) = spawn_test_api(&server, None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(url(addr, "pairs"))
        .json(&json!([pair_json(("gate", "BTC_USDT"), ("kraken", "XBTUSD"))]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("kraken"));

    assert!(engine.pairs.symbols().await.is_empty());

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_auth_middleware() {
    let server = MockServer::start().await;
    let (engine, addr) = spawn_test_api(&server, Some(TOKEN)).await;
    let client = reqwest::Client::new();

    let open = client.get(url(addr, "health")).send().await.unwrap();
    assert_eq!(open.status(), StatusCode::OK);

    let missing = client.get(url(addr, "symbols")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let malformed = client
        .get(url(addr, "symbols"))
        .header("authorization", TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::UNAUTHORIZED);

    let wrong = client
        .get(url(addr, "symbols"))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

    let valid = client
        .get(url(addr, "symbols"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(valid.status(), StatusCode::OK);

    engine.shutdown().await.unwrap();
}
