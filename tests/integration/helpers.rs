//! Shared fakes and builders for the integration tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use market_sentinel::{
    cache::{ExpiringCache, SnapshotCache},
    config::{VolumeMonitorConfig, VolumeMonitorPlatform},
    exchange::{ExchangeRegistry, binance::BinanceClient, gate::GateClient},
    monitors::{composition::CompositionMonitor, volume::VolumeMonitor},
    notify::{Notifier, NotifyError},
};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::Instant;
use wiremock::MockServer;

/// Notifier recording every message with the (tokio) time it was sent
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Instant, String)>>,
}

impl RecordingNotifier {
    pub async fn messages(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|(_, m)| m.clone()).collect()
    }

    pub async fn times(&self) -> Vec<Instant> {
        self.sent.lock().await.iter().map(|(t, _)| *t).collect()
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Poll until `expected` messages arrived or `timeout` passed
    pub async fn wait_for(&self, expected: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let count = self.count().await;
            if count >= expected || Instant::now() >= deadline {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .await
            .push((Instant::now(), message.to_string()));
        Ok(())
    }
}

/// Registry whose Gate and Binance clients both talk to `server`
pub fn mocked_registry(server: &MockServer) -> ExchangeRegistry {
    let client = reqwest::Client::new();
    let mut registry = ExchangeRegistry::new();
    registry.insert(Arc::new(GateClient::with_base_urls(
        client.clone(),
        server.uri(),
        server.uri(),
    )));
    registry.insert(Arc::new(BinanceClient::with_base_url(client, server.uri())));
    registry
}

pub fn volume_config(notify_count: u32) -> VolumeMonitorConfig {
    VolumeMonitorConfig {
        notify_count,
        platform: vec![
            VolumeMonitorPlatform {
                platform: "gate".to_string(),
                threshold_usd: Some(1_000_000.0),
            },
            VolumeMonitorPlatform {
                platform: "Binance".to_string(),
                threshold_usd: Some(10_000_000.0),
            },
        ],
        ..VolumeMonitorConfig::default()
    }
}

pub fn volume_monitor(
    registry: ExchangeRegistry,
    notifier: Arc<RecordingNotifier>,
    notify_count: u32,
) -> VolumeMonitor {
    let config = volume_config(notify_count);
    VolumeMonitor::new(
        registry,
        Arc::new(ExpiringCache::new(config.throttle_window())),
        notifier,
        config,
    )
}

pub fn composition_monitor(
    registry: ExchangeRegistry,
    notifier: Arc<RecordingNotifier>,
) -> CompositionMonitor {
    CompositionMonitor::new(
        registry,
        Arc::new(SnapshotCache::new()),
        notifier,
        Duration::from_millis(60),
    )
}

/// Body of Gate `/api/v4/futures/usdt/tickers`
pub fn gate_tickers(tickers: &[(&str, &str)]) -> Value {
    Value::Array(
        tickers
            .iter()
            .map(|(contract, volume)| json!({"contract": contract, "volume_24h_settle": volume}))
            .collect(),
    )
}

/// Body of Binance `/fapi/v1/constituents`
pub fn binance_constituents(symbol: &str, members: &[(&str, &str)]) -> Value {
    json!({
        "symbol": symbol,
        "time": 1_700_000_000_000u64,
        "constituents": members
            .iter()
            .map(|(exchange, weight)| json!({"exchange": exchange, "symbol": symbol, "weight": weight}))
            .collect::<Vec<_>>(),
    })
}

/// One pair as posted to `/api/v1/pairs`
pub fn pair_json(a: (&str, &str), b: (&str, &str)) -> Value {
    json!({
        "id": format!("{}-{}", a.1, b.1),
        "ts": 1_700_000_000,
        "a": {"name": a.1, "exchange": a.0, "symbol": a.1, "type": "perp"},
        "b": {"name": b.1, "exchange": b.0, "symbol": b.1, "type": "perp"},
    })
}
