//! BalanceActor - periodic wallet balance checks
//!
//! ```text
//! Timer tick → check every wallet concurrently → notify out-of-bounds balances
//!     ↑
//!     └─── Commands (CheckNow, Shutdown)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use super::messages::BalanceCommand;
use crate::config::TokenConfig;
use crate::monitors::balance::{BalanceError, BalanceMonitor, BalanceReading};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct BalanceActor {
    monitor: Arc<BalanceMonitor>,
    tokens: Vec<TokenConfig>,
    command_rx: mpsc::Receiver<BalanceCommand>,
    interval_duration: Duration,
}

impl BalanceActor {
    pub fn new(
        monitor: Arc<BalanceMonitor>,
        tokens: Vec<TokenConfig>,
        interval_duration: Duration,
        command_rx: mpsc::Receiver<BalanceCommand>,
    ) -> Self {
        Self {
            monitor,
            tokens,
            command_rx,
            interval_duration: interval_duration.max(MIN_INTERVAL),
        }
    }

    #[instrument(skip(self), fields(wallets = self.tokens.len()))]
    pub async fn run(mut self) {
        debug!("starting balance actor");

        let mut ticker = interval(self.interval_duration);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        BalanceCommand::CheckNow { respond_to } => {
                            debug!("received CheckNow command");
                            let _ = respond_to.send(self.check().await);
                        }

                        BalanceCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("balance actor stopped");
    }

    async fn check(&self) -> Vec<Result<BalanceReading, BalanceError>> {
        let readings = self.monitor.check_all(&self.tokens).await;
        let failed = readings.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!("{failed} of {} balance check(s) failed", readings.len());
        }
        info!("next balance check in {}s", self.interval_duration.as_secs());
        readings
    }
}

/// Handle for controlling a BalanceActor
#[derive(Debug, Clone)]
pub struct BalanceHandle {
    sender: mpsc::Sender<BalanceCommand>,
}

impl BalanceHandle {
    pub fn spawn(monitor: Arc<BalanceMonitor>, tokens: Vec<TokenConfig>, every: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let actor = BalanceActor::new(monitor, tokens, every, cmd_rx);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Check every wallet right away
    pub async fn check_now(&self) -> Result<Vec<Result<BalanceReading, BalanceError>>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(BalanceCommand::CheckNow { respond_to: tx })
            .await
            .context("failed to send CheckNow command")?;

        rx.await.context("failed to receive balance readings")
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(BalanceCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
