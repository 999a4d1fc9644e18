//! Volume and composition monitors against mocked exchange APIs

use std::collections::BTreeSet;
use std::sync::Arc;

use market_sentinel::exchange::{Exchange, FetchError};
use market_sentinel::monitors::CheckOutcome;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{
    RecordingNotifier, binance_constituents, composition_monitor, gate_tickers, mocked_registry,
    volume_monitor,
};

fn set(symbols: &[&str]) -> BTreeSet<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_gate_volume_alert_is_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/futures/usdt/tickers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gate_tickers(&[
            ("BTC_USDT", "900000000"),
            ("LOW_USDT", "12345.6"),
            ("OTHER_USDT", "1"),
        ])))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = volume_monitor(mocked_registry(&server), notifier.clone(), 3);
    let interest = set(&["BTC_USDT", "LOW_USDT"]);

    for _ in 0..5 {
        monitor.check(Exchange::Gate, &interest).await;
    }

    let messages = notifier.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages[0],
        "Volume too low on gate:\nsymbol: LOW_USDT, 24h volume: 12345.6"
    );
}

#[tokio::test]
async fn test_binance_threshold_uses_quote_volume() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/ticker/24hr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"symbol": "BTCUSDT", "volume": "1", "quoteVolume": "50000000"},
            {"symbol": "XYZUSDT", "volume": "99999999", "quoteVolume": "200"}
        ])))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = volume_monitor(mocked_registry(&server), notifier.clone(), 3);

    let outcome = monitor
        .check(Exchange::Binance, &set(&["BTCUSDT", "XYZUSDT"]))
        .await;

    assert_eq!(outcome.report().unwrap().alerted, vec!["XYZUSDT"]);
}

#[tokio::test]
async fn test_exchange_outage_is_a_failed_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = volume_monitor(mocked_registry(&server), notifier.clone(), 3);

    let outcome = monitor.check(Exchange::Gate, &set(&["BTC_USDT"])).await;

    assert!(matches!(
        outcome,
        CheckOutcome::Failed(FetchError::Status { code: 502, .. })
    ));
    assert_eq!(notifier.count().await, 0);
}

#[tokio::test]
async fn test_composition_change_is_reported_once() {
    let server = MockServer::start().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = composition_monitor(mocked_registry(&server), notifier.clone());
    let interest = set(&["BTCUSDT"]);

    Mock::given(method("GET"))
        .and(path("/fapi/v1/constituents"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(binance_constituents(
            "BTCUSDT",
            &[("binance", "0.5"), ("okex", "0.3"), ("bybit", "0.2")],
        )))
        .mount(&server)
        .await;
    monitor.check(Exchange::Binance, &interest).await;
    server.reset().await;

    // same members, different feed order
    Mock::given(method("GET"))
        .and(path("/fapi/v1/constituents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(binance_constituents(
            "BTCUSDT",
            &[("bybit", "0.2"), ("binance", "0.5"), ("okex", "0.3")],
        )))
        .mount(&server)
        .await;
    monitor.check(Exchange::Binance, &interest).await;
    assert_eq!(notifier.count().await, 0);
    server.reset().await;

    Mock::given(method("GET"))
        .and(path("/fapi/v1/constituents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(binance_constituents(
            "BTCUSDT",
            &[("binance", "0.6"), ("okex", "0.4")],
        )))
        .mount(&server)
        .await;
    monitor.check(Exchange::Binance, &interest).await;
    monitor.check(Exchange::Binance, &interest).await;

    let messages = notifier.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("[Old]:\n  - binance: BTCUSDT (Weight: 0.5)"));
    assert!(messages[0].contains("[New]:\n  - binance: BTCUSDT (Weight: 0.6)"));
}

#[tokio::test]
async fn test_gate_breakdown_failure_keeps_going() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apiw/v2/futures/common/index/breakdown"))
        .and(query_param("index", "BAD_USDT"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apiw/v2/futures/common/index/breakdown"))
        .and(query_param("index", "BTC_USDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "success",
            "data": {
                "index": "BTC_USDT",
                "constituents": [{"symbol": "BTCUSDT", "exchange": "Binance", "weight": "1"}]
            }
        })))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = composition_monitor(mocked_registry(&server), notifier.clone());

    let outcome = monitor
        .check(Exchange::Gate, &set(&["BAD_USDT", "BTC_USDT"]))
        .await;

    let report = outcome.report().unwrap();
    assert_eq!(report.failed, vec!["BAD_USDT"]);
    assert_eq!(report.first_seen, vec!["BTC_USDT"]);
}
