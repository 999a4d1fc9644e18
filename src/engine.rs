//! Assembly of the shared stores, monitors and actors

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::actors::balance::BalanceHandle;
use crate::actors::scheduler::{SchedulerHandle, SchedulerSettings};
use crate::cache::{ExpiringCache, SnapshotCache};
use crate::config::Config;
use crate::exchange::ExchangeRegistry;
use crate::monitors::balance::{BalanceMonitor, EvmClient, RpcPool};
use crate::monitors::composition::CompositionMonitor;
use crate::monitors::heartbeat::{HeartbeatWatchdog, WatchdogSettings};
use crate::monitors::volume::VolumeMonitor;
use crate::notify::Notifier;
use crate::pairs::{PairRegistry, SymbolSets};

const THROTTLE_SWEEP_PERIOD: Duration = Duration::from_secs(3600);

/// Everything the hub runs, started from one [`Config`]
pub struct Engine {
    pub watchdog: Arc<HeartbeatWatchdog>,
    pub pairs: Arc<PairRegistry>,
    pub scheduler: SchedulerHandle,
    pub balance: Option<BalanceHandle>,
    sweeper: JoinHandle<()>,
}

impl Engine {
    /// Build the stores and spawn the background actors
    ///
    /// `client` is used for JSON-RPC balance requests, the market sources in
    /// `registry` bring their own.
    pub fn start(
        config: &Config,
        registry: ExchangeRegistry,
        notifier: Arc<dyn Notifier>,
        client: reqwest::Client,
    ) -> Self {
        debug!("starting engine with {registry:?}");

        let symbols: Arc<SymbolSets> = Arc::new(SnapshotCache::new());
        let throttle = Arc::new(ExpiringCache::new(config.volume_monitor.throttle_window()));
        let sweeper = throttle.spawn_sweeper(THROTTLE_SWEEP_PERIOD);

        let volume = Arc::new(VolumeMonitor::new(
            registry.clone(),
            throttle,
            Arc::clone(&notifier),
            config.volume_monitor.clone(),
        ));
        let composition = Arc::new(CompositionMonitor::new(
            registry,
            Arc::new(SnapshotCache::new()),
            Arc::clone(&notifier),
            config.composition_monitor.request_delay(),
        ));

        let watchdog = HeartbeatWatchdog::new(
            WatchdogSettings::from(&config.health_check),
            Arc::clone(&notifier),
        );
        let pairs = Arc::new(PairRegistry::new(Arc::clone(&symbols), Arc::clone(&volume)));

        let scheduler = SchedulerHandle::spawn(
            symbols,
            composition,
            volume,
            SchedulerSettings {
                cycle_delay: config.composition_monitor.cycle_delay(),
                volume_interval: config.volume_monitor.interval(),
            },
        );

        let balance = if config.tokens.is_empty() {
            info!("no wallets configured, balance monitor disabled");
            None
        } else {
            let monitor = BalanceMonitor::new(EvmClient::new(client, RpcPool::new(&config.rpc)), notifier);
            Some(BalanceHandle::spawn(
                Arc::new(monitor),
                config.tokens.clone(),
                Duration::from_secs(config.interval.max(1)),
            ))
        };

        Self {
            watchdog,
            pairs,
            scheduler,
            balance,
            sweeper,
        }
    }

    /// Stop the actors and the throttle sweeper
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.scheduler.shutdown().await?;
        if let Some(balance) = &self.balance {
            balance.shutdown().await?;
        }
        self.sweeper.abort();
        info!("engine stopped");
        Ok(())
    }
}
