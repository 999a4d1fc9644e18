//! 24h volume floor monitor
//!
//! Compares the live 24h volume of the symbols of interest against the floor
//! configured for the exchange. Every low symbol spends one slot of its
//! throttle counter; once `notify_count` slots are spent the symbol stays
//! quiet until the counter expires with the throttle window.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use super::{CheckOutcome, MonitorKind, ThrottleKey};
use crate::cache::ExpiringCache;
use crate::config::VolumeMonitorConfig;
use crate::exchange::{Exchange, ExchangeRegistry, VolumeTicker};
use crate::notify::Notifier;

/// What a completed volume check found
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeReport {
    /// Symbols included in the notification
    pub alerted: Vec<String>,

    /// Low symbols whose notify cap was already reached
    pub throttled: Vec<String>,

    /// Whether sending the notification failed
    pub notify_failed: bool,
}

pub struct VolumeMonitor {
    registry: ExchangeRegistry,
    throttle: Arc<ExpiringCache<ThrottleKey, u32>>,
    notifier: Arc<dyn Notifier>,
    config: VolumeMonitorConfig,
}

impl VolumeMonitor {
    pub fn new(
        registry: ExchangeRegistry,
        throttle: Arc<ExpiringCache<ThrottleKey, u32>>,
        notifier: Arc<dyn Notifier>,
        config: VolumeMonitorConfig,
    ) -> Self {
        Self {
            registry,
            throttle,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &VolumeMonitorConfig {
        &self.config
    }

    /// Check the volume of `symbols` on `exchange`
    #[instrument(skip(self, symbols), fields(symbols = symbols.len()))]
    pub async fn check(
        &self,
        exchange: Exchange,
        symbols: &BTreeSet<String>,
    ) -> CheckOutcome<VolumeReport> {
        let Some(source) = self.registry.get(exchange) else {
            debug!("no market source for {exchange}, skipping volume check");
            return CheckOutcome::Unsupported;
        };

        if symbols.is_empty() {
            return CheckOutcome::Completed(VolumeReport::default());
        }

        let tickers = match source.fetch_volumes().await {
            Ok(tickers) => tickers,
            Err(e) => {
                error!("failed to fetch {exchange} volumes: {e}");
                return CheckOutcome::Failed(e);
            }
        };

        let floor = self.config.threshold_for(exchange);
        let mut report = VolumeReport::default();
        let mut lines = vec![];

        for ticker in low_volume(&tickers, symbols, floor) {
            let key = ThrottleKey::new(MonitorKind::Volume, exchange.as_str(), &ticker.symbol);
            if self.spend_slot(key).await {
                lines.push(format!(
                    "symbol: {}, 24h volume: {}",
                    ticker.symbol, ticker.raw_volume
                ));
                report.alerted.push(ticker.symbol.clone());
            } else {
                debug!("{} volume alert throttled", ticker.symbol);
                report.throttled.push(ticker.symbol.clone());
            }
        }

        if lines.is_empty() {
            return CheckOutcome::Completed(report);
        }

        let message = format!("Volume too low on {exchange}:\n{}", lines.join("\n"));
        info!("{} symbol(s) below {floor} on {exchange}", lines.len());

        if let Err(e) = self.notifier.notify(&message).await {
            error!("failed to send volume alert: {e}");
            report.notify_failed = true;
        }

        CheckOutcome::Completed(report)
    }

    /// Take one notification slot for `key`, `false` when the cap is reached
    async fn spend_slot(&self, key: ThrottleKey) -> bool {
        let cap = self.config.notify_count;
        self.throttle
            .update(key, |count| {
                let count = count.copied().unwrap_or(0);
                (count < cap).then_some(count + 1)
            })
            .await
            .is_some()
    }
}

/// Tickers of interest whose volume is strictly below `floor`
fn low_volume<'a>(
    tickers: &'a [VolumeTicker],
    symbols: &'a BTreeSet<String>,
    floor: f64,
) -> impl Iterator<Item = &'a VolumeTicker> {
    tickers
        .iter()
        .filter(move |t| symbols.contains(&t.symbol) && t.volume_24h < floor)
}
