//! MonitorScheduler - drives the market monitors
//!
//! Every cycle the scheduler takes a copy of the registered symbol sets and
//! runs the monitors of every exchange concurrently, waiting for all of them
//! before sleeping for the cycle delay.
//!
//! ## Message Flow
//!
//! ```text
//! cycle delay → copy symbol sets → per exchange: composition check ┐
//!     ↑                                         (+ volume check)   ├→ join → CycleReport
//!     │                                                            ┘
//!     └─── Commands (RunNow, Shutdown)
//! ```
//!
//! The composition check runs every cycle. The volume check only runs when
//! `volume_interval` has passed since it last ran, registrations trigger
//! their own immediate volume check.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, instrument, trace, warn};

use super::messages::{CycleReport, SchedulerCommand};
use crate::monitors::CheckOutcome;
use crate::monitors::composition::CompositionMonitor;
use crate::monitors::volume::VolumeMonitor;
use crate::pairs::SymbolSets;

/// Timing of the scheduler loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub cycle_delay: Duration,
    pub volume_interval: Duration,
}

pub struct MonitorScheduler {
    symbols: Arc<SymbolSets>,
    composition: Arc<CompositionMonitor>,
    volume: Arc<VolumeMonitor>,
    settings: SchedulerSettings,
    command_rx: mpsc::Receiver<SchedulerCommand>,
    last_volume_check: Option<Instant>,
}

impl MonitorScheduler {
    pub fn new(
        symbols: Arc<SymbolSets>,
        composition: Arc<CompositionMonitor>,
        volume: Arc<VolumeMonitor>,
        settings: SchedulerSettings,
        command_rx: mpsc::Receiver<SchedulerCommand>,
    ) -> Self {
        Self {
            symbols,
            composition,
            volume,
            settings,
            command_rx,
            last_volume_check: None,
        }
    }

    /// Run the scheduler loop until a Shutdown command arrives
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting monitor scheduler");

        let mut next_cycle = Instant::now();

        loop {
            tokio::select! {
                _ = sleep_until(next_cycle) => {
                    self.run_cycle(false).await;
                    next_cycle = Instant::now() + self.settings.cycle_delay;
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::RunNow { respond_to }) => {
                            debug!("received RunNow command");
                            let report = self.run_cycle(true).await;
                            let _ = respond_to.send(report);
                            next_cycle = Instant::now() + self.settings.cycle_delay;
                        }

                        Some(SchedulerCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("monitor scheduler stopped");
    }

    async fn run_cycle(&mut self, force_volume: bool) -> CycleReport {
        let volume_due = force_volume
            || self
                .last_volume_check
                .is_none_or(|at| at.elapsed() >= self.settings.volume_interval);
        if volume_due {
            self.last_volume_check = Some(Instant::now());
        }

        let mut sets: Vec<_> = self
            .symbols
            .get_all()
            .await
            .into_iter()
            .filter(|(_, symbols)| !symbols.is_empty())
            .collect();
        sets.sort_by_key(|(exchange, _)| *exchange);

        trace!("cycle over {} exchange(s), volume due: {volume_due}", sets.len());

        let composition = &self.composition;
        let volume = &self.volume;
        let checks = sets.iter().map(|(exchange, symbols)| async move {
            let composition_check = composition.check(*exchange, symbols);
            let volume_check = async {
                if volume_due {
                    Some(volume.check(*exchange, symbols).await)
                } else {
                    None
                }
            };
            let (composition_outcome, volume_outcome) =
                tokio::join!(composition_check, volume_check);
            (*exchange, composition_outcome, volume_outcome)
        });

        let mut report = CycleReport {
            volume_checked: volume_due,
            ..CycleReport::default()
        };

        for (exchange, composition_outcome, volume_outcome) in join_all(checks).await {
            report.exchanges.push(exchange);

            match composition_outcome {
                CheckOutcome::Completed(found) => report
                    .composition_changes
                    .extend(found.changed.into_iter().map(|s| (exchange, s))),
                CheckOutcome::Unsupported => report.unsupported.push(exchange),
                CheckOutcome::Failed(_) => {}
            }

            if let Some(CheckOutcome::Completed(found)) = volume_outcome {
                report
                    .volume_alerts
                    .extend(found.alerted.into_iter().map(|s| (exchange, s)));
            }
        }

        if !report.composition_changes.is_empty() || !report.volume_alerts.is_empty() {
            info!(
                "cycle finished: {} composition change(s), {} volume alert(s)",
                report.composition_changes.len(),
                report.volume_alerts.len()
            );
        }

        report
    }
}

/// Handle for controlling the MonitorScheduler
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Spawn the scheduler loop as a tokio task
    pub fn spawn(
        symbols: Arc<SymbolSets>,
        composition: Arc<CompositionMonitor>,
        volume: Arc<VolumeMonitor>,
        settings: SchedulerSettings,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let scheduler = MonitorScheduler::new(symbols, composition, volume, settings, cmd_rx);

        tokio::spawn(scheduler.run());

        Self { sender: cmd_tx }
    }

    /// Run one cycle right away and wait for its report
    pub async fn run_now(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::RunNow { respond_to: tx })
            .await
            .context("failed to send RunNow command")?;

        rx.await.context("failed to receive cycle report")
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
