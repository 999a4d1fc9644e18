//! Index composition change monitor

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, instrument, trace};

use super::CheckOutcome;
use crate::cache::SnapshotCache;
use crate::exchange::{ConstituentSnapshot, Exchange, ExchangeRegistry};
use crate::notify::Notifier;

/// Cache key of the last seen composition
pub type SnapshotKey = (Exchange, String);

/// What a completed composition check found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionReport {
    /// Symbols whose composition differs from the cached one
    pub changed: Vec<String>,

    /// Symbols seen for the first time, cached without alerting
    pub first_seen: Vec<String>,

    /// Symbols whose snapshot could not be fetched
    pub failed: Vec<String>,
}

pub struct CompositionMonitor {
    registry: ExchangeRegistry,
    snapshots: Arc<SnapshotCache<SnapshotKey, ConstituentSnapshot>>,
    notifier: Arc<dyn Notifier>,
    request_delay: Duration,
}

impl CompositionMonitor {
    pub fn new(
        registry: ExchangeRegistry,
        snapshots: Arc<SnapshotCache<SnapshotKey, ConstituentSnapshot>>,
        notifier: Arc<dyn Notifier>,
        request_delay: Duration,
    ) -> Self {
        Self {
            registry,
            snapshots,
            notifier,
            request_delay,
        }
    }

    /// Compare the current composition of every symbol with the cached one
    ///
    /// Symbols are fetched one after another, `request_delay` apart. A fetch
    /// failure leaves the cached snapshot of that symbol as it was.
    #[instrument(skip(self, symbols), fields(symbols = symbols.len()))]
    pub async fn check(
        &self,
        exchange: Exchange,
        symbols: &BTreeSet<String>,
    ) -> CheckOutcome<CompositionReport> {
        let Some(source) = self.registry.get(exchange) else {
            debug!("no market source for {exchange}, skipping composition check");
            return CheckOutcome::Unsupported;
        };

        let mut report = CompositionReport::default();

        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 {
                sleep(self.request_delay).await;
            }

            let snapshot = match source.fetch_constituents(symbol).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!("failed to fetch {exchange} constituents of {symbol}: {e}");
                    report.failed.push(symbol.clone());
                    continue;
                }
            };

            let current = snapshot.canonical();
            let previous = self
                .snapshots
                .set((exchange, symbol.clone()), snapshot)
                .await;

            let Some(previous) = previous else {
                trace!("first composition of {symbol} cached");
                report.first_seen.push(symbol.clone());
                continue;
            };

            let old = previous.canonical();
            if old == current {
                continue;
            }

            info!("{exchange} index composition of {symbol} changed");
            report.changed.push(symbol.clone());

            let message = change_message(exchange, symbol, &old, &current);
            if let Err(e) = self.notifier.notify(&message).await {
                error!("failed to send composition alert: {e}");
            }
        }

        CheckOutcome::Completed(report)
    }
}

fn change_message(exchange: Exchange, symbol: &str, old: &str, new: &str) -> String {
    format!("{exchange} index constituents changed for {symbol}:\n[Old]:\n{old}\n\n[New]:\n{new}")
}
