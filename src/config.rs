use std::path::Path;
use std::time::Duration;

use tracing::trace;

use crate::exchange::Exchange;

/// Volume floor used when an exchange has no configured threshold
pub fn default_volume_threshold(exchange: Exchange) -> f64 {
    match exchange {
        Exchange::Gate => 500_000.0,
        Exchange::Binance => 5_000_000.0,
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Seconds between wallet balance checks
    #[serde(default = "default_balance_interval")]
    pub interval: u64,

    #[serde(default)]
    pub tokens: Vec<TokenConfig>,

    #[serde(default)]
    pub health_check: HealthCheckConfig,

    #[serde(default)]
    pub volume_monitor: VolumeMonitorConfig,

    #[serde(default)]
    pub composition_monitor: CompositionMonitorConfig,

    /// Extra JSON-RPC endpoints per chain id, tried before the built-in ones
    #[serde(default)]
    pub rpc: Vec<RpcConfig>,
}

/// Notification channels, every configured one receives every message
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct WebhookConfig {
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub wecom: Option<String>,
    pub lark: Option<String>,
    pub discord: Option<Discord>,
    pub webhook: Option<Webhook>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TokenConfig {
    pub address: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    pub name: Option<String>,
    #[serde(default = "default_min_balance")]
    pub min: f64,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RpcConfig {
    pub chain_id: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HealthCheckConfig {
    /// Seconds without heartbeat before an entity is considered late
    #[serde(default = "default_health_interval")]
    pub interval: u64,

    /// Number of notifications per escalation burst
    #[serde(default = "default_warn_count")]
    pub warn_count: u32,

    /// Keep timing an entity after an escalation burst ran out without recovery
    #[serde(default)]
    pub rearm_after_escalation: bool,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: default_health_interval(),
            warn_count: default_warn_count(),
            rearm_after_escalation: false,
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct VolumeMonitorConfig {
    /// Notifications per symbol within one throttle window
    #[serde(default = "default_notify_count")]
    pub notify_count: u32,

    #[serde(default = "default_throttle_window_secs")]
    pub throttle_window_secs: u64,

    /// Seconds between scheduled volume checks of registered symbols
    #[serde(default = "default_volume_interval")]
    pub interval: u64,

    #[serde(default)]
    pub platform: Vec<VolumeMonitorPlatform>,
}

impl Default for VolumeMonitorConfig {
    fn default() -> Self {
        Self {
            notify_count: default_notify_count(),
            throttle_window_secs: default_throttle_window_secs(),
            interval: default_volume_interval(),
            platform: vec![],
        }
    }
}

impl VolumeMonitorConfig {
    /// Configured floor for `exchange`, or the built-in fallback
    pub fn threshold_for(&self, exchange: Exchange) -> f64 {
        self.platform
            .iter()
            .find(|p| p.platform.eq_ignore_ascii_case(exchange.as_str()))
            .and_then(|p| p.threshold_usd)
            .filter(|threshold| *threshold > 0.0)
            .unwrap_or_else(|| default_volume_threshold(exchange))
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_secs(self.throttle_window_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct VolumeMonitorPlatform {
    pub platform: String,
    pub threshold_usd: Option<f64>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CompositionMonitorConfig {
    #[serde(default = "default_cycle_delay_secs")]
    pub cycle_delay_secs: u64,

    /// Pause between two constituent requests to the same exchange
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl Default for CompositionMonitorConfig {
    fn default() -> Self {
        Self {
            cycle_delay_secs: default_cycle_delay_secs(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl CompositionMonitorConfig {
    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(self.cycle_delay_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

fn default_balance_interval() -> u64 {
    30
}

fn default_chain_id() -> String {
    String::from("56")
}

fn default_min_balance() -> f64 {
    0.1
}

fn default_health_interval() -> u64 {
    10
}

fn default_warn_count() -> u32 {
    3
}

fn default_notify_count() -> u32 {
    3
}

fn default_throttle_window_secs() -> u64 {
    24 * 3600
}

fn default_volume_interval() -> u64 {
    60
}

fn default_cycle_delay_secs() -> u64 {
    3
}

fn default_request_delay_ms() -> u64 {
    60
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map(Config::with_defaults_for_zero)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
}

impl Config {
    /// Treat zero (and a non-positive `min`) as "not set"
    fn with_defaults_for_zero(mut self) -> Self {
        fn or_default<T: PartialEq + Default>(value: &mut T, default: T) {
            if *value == T::default() {
                *value = default;
            }
        }

        or_default(&mut self.interval, default_balance_interval());
        or_default(&mut self.health_check.interval, default_health_interval());
        or_default(&mut self.health_check.warn_count, default_warn_count());
        or_default(
            &mut self.volume_monitor.throttle_window_secs,
            default_throttle_window_secs(),
        );
        or_default(&mut self.volume_monitor.interval, default_volume_interval());
        or_default(
            &mut self.composition_monitor.cycle_delay_secs,
            default_cycle_delay_secs(),
        );

        for token in &mut self.tokens {
            if token.chain_id.trim().is_empty() {
                token.chain_id = default_chain_id();
            }
            if token.min <= 0.0 {
                token.min = default_min_balance();
            }
            if token.max == Some(0.0) {
                token.max = None;
            }
        }

        self
    }
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content).inspect(|config| trace!("loaded config: {config:?}"))
}

pub const EXAMPLE_CONFIG: &str = r#"{
  "webhook": {
    "telegram_token": "",
    "telegram_chat_id": "",
    "wecom": "",
    "lark": ""
  },
  "interval": 30,
  "tokens": [
    {
      "address": "0x1234567890abcdef1234567890abcdef12345678",
      "chain_id": "56",
      "name": "MyWallet01",
      "min": 0.1,
      "max": 1000
    }
  ],
  "health_check": {
    "interval": 10,
    "warn_count": 3
  },
  "volume_monitor": {
    "notify_count": 3,
    "platform": [
      { "platform": "gate", "threshold_usd": 1000000 },
      { "platform": "binance", "threshold_usd": 10000000 }
    ]
  },
  "composition_monitor": {
    "cycle_delay_secs": 3,
    "request_delay_ms": 60
  }
}
"#;

/// Write the example configuration to `path`
pub fn write_example_config(path: impl AsRef<Path>) -> anyhow::Result<()> {
    std::fs::write(path, EXAMPLE_CONFIG)?;
    Ok(())
}
