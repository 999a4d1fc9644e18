//! Registration → immediate volume check → scheduled composition checks

use std::sync::Arc;
use std::time::Duration;

use market_sentinel::{
    Engine,
    config::parse_config,
    exchange::Exchange,
    pairs::{PairInfo, RegistrationError},
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{
    RecordingNotifier, binance_constituents, gate_tickers, mocked_registry, pair_json,
};

fn pairs(values: Vec<serde_json::Value>) -> Vec<PairInfo> {
    serde_json::from_value(serde_json::Value::Array(values)).unwrap()
}

async fn engine(server: &MockServer) -> (Engine, Arc<RecordingNotifier>) {
    let config = parse_config(
        r#"{
            "volume_monitor": {
                "notify_count": 2,
                "platform": [{ "platform": "gate", "threshold_usd": 1000 }]
            },
            "composition_monitor": { "cycle_delay_secs": 3600, "request_delay_ms": 1 }
        }"#,
    )
    .unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Engine::start(
        &config,
        mocked_registry(server),
        notifier.clone(),
        reqwest::Client::new(),
    );
    (engine, notifier)
}

#[tokio::test]
async fn test_registration_triggers_volume_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/futures/usdt/tickers"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gate_tickers(&[("THIN_USDT", "10")])),
        )
        .mount(&server)
        .await;
    let (engine, notifier) = engine(&server).await;

    let ack = engine
        .pairs
        .register_pairs(&pairs(vec![pair_json(
            ("gate", "THIN_USDT"),
            ("gate", "THIN_USDT"),
        )]))
        .await
        .unwrap();

    assert_eq!(ack.exchanges[&Exchange::Gate].len(), 1);
    assert!(notifier.wait_for(1, Duration::from_secs(5)).await >= 1);
    assert!(
        notifier
            .messages()
            .await
            .iter()
            .any(|m| m == "Volume too low on gate:\nsymbol: THIN_USDT, 24h volume: 10")
    );

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_batch_leaves_symbols_untouched() {
    let server = MockServer::start().await;
    let (engine, _) = engine(&server).await;

    let result = engine
        .pairs
        .register_pairs(&pairs(vec![pair_json(
            ("gate", "BTC_USDT"),
            ("kraken", "XBTUSD"),
        )]))
        .await;

    assert_eq!(
        result,
        Err(RegistrationError::UnknownExchange("kraken".to_string()))
    );
    assert!(engine.pairs.symbols().await.is_empty());

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_scheduler_detects_composition_change() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/ticker/24hr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/constituents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(binance_constituents(
            "ETHUSDT",
            &[("binance", "0.5"), ("okex", "0.5")],
        )))
        .mount(&server)
        .await;
    let (engine, notifier) = engine(&server).await;

    engine
        .pairs
        .register_pairs(&pairs(vec![pair_json(
            ("binance", "ETHUSDT"),
            ("binance", "ETHUSDT"),
        )]))
        .await
        .unwrap();

    let first = engine.scheduler.run_now().await.unwrap();
    assert_eq!(first.exchanges, vec![Exchange::Binance]);
    assert!(first.composition_changes.is_empty());

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/ticker/24hr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/constituents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(binance_constituents(
            "ETHUSDT",
            &[("binance", "0.7"), ("okex", "0.3")],
        )))
        .mount(&server)
        .await;

    let second = engine.scheduler.run_now().await.unwrap();

    assert_eq!(
        second.composition_changes,
        vec![(Exchange::Binance, "ETHUSDT".to_string())]
    );
    assert!(
        notifier
            .messages()
            .await
            .iter()
            .any(|m| m.starts_with("binance index constituents changed for ETHUSDT:"))
    );

    engine.shutdown().await.unwrap();
}
