//! Heartbeat watchdog
//!
//! Entities announce they are alive by sending heartbeats. Each heartbeat
//! (re)arms a timer of `interval`; when the timer fires before the next
//! heartbeat the entity enters an escalation burst of up to `warn_count`
//! notifications spaced `interval` apart. A heartbeat at any point cancels
//! the burst and re-arms the timer.
//!
//! ## State machine
//!
//! ```text
//!            HeartbeatReceived                TimeoutFired
//! Unseen ──────────────────────▶ Healthy ──────────────────▶ Escalating
//!                                   ▲                           │
//!                                   └──── HeartbeatReceived ────┤
//!                                                               │ burst exhausted
//!                                   Dormant ◀───────────────────┘
//! ```
//!
//! A `Dormant` entity has no timer; its next heartbeat makes it `Healthy`
//! again. With `rearm_after_escalation` the exhausted burst re-arms the timer
//! instead and the entity stays `Healthy`.
//!
//! ## Locking
//!
//! Every entity has its own `Mutex`-guarded record. The entity map lock is
//! only held to look records up or insert them, never across a sleep or a
//! notification.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::HealthCheckConfig;
use crate::notify::Notifier;

/// Observable state of a watched entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    Unseen,
    Healthy,
    Escalating,
    Dormant,
}

/// Events driving [`EntityState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    HeartbeatReceived,
    TimeoutFired,
}

/// What the watchdog has to do in response to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    /// Cancel any pending timer or burst and arm a fresh timer
    Rearm,
    /// Start an escalation burst
    Escalate,
    /// Nothing to do
    Ignore,
}

/// Pure transition function of the watchdog
pub fn transition(state: EntityState, event: WatchEvent) -> (EntityState, WatchAction) {
    use EntityState::*;

    match (state, event) {
        (_, WatchEvent::HeartbeatReceived) => (Healthy, WatchAction::Rearm),
        (Healthy, WatchEvent::TimeoutFired) => (Escalating, WatchAction::Escalate),
        // a burst is already running, or nothing is being timed
        (Escalating | Unseen | Dormant, WatchEvent::TimeoutFired) => (state, WatchAction::Ignore),
    }
}

/// Rejected heartbeat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatError {
    EmptyName,
}

impl fmt::Display for HeartbeatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeartbeatError::EmptyName => write!(f, "heartbeat name must not be empty"),
        }
    }
}

impl std::error::Error for HeartbeatError {}

/// Returned to the sender of an accepted heartbeat
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatAck {
    pub last_heartbeat: DateTime<Utc>,
    pub next_check: DateTime<Utc>,
}

/// Point-in-time view of one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatView {
    pub name: String,
    pub state: EntityState,
    pub last_heartbeat: DateTime<Utc>,
    pub consecutive_warnings: u32,
}

/// Timing settings of the watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogSettings {
    pub interval: Duration,
    pub warn_count: u32,
    pub rearm_after_escalation: bool,
}

impl From<&HealthCheckConfig> for WatchdogSettings {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            interval: config.interval(),
            warn_count: config.warn_count,
            rearm_after_escalation: config.rearm_after_escalation,
        }
    }
}

#[derive(Debug)]
struct HeartbeatStatus {
    name: String,
    last_heartbeat_at: DateTime<Utc>,
    /// Heartbeat sequence number, bumped on every heartbeat
    beats: u64,
    /// Identifies the timer currently owned by the record
    timer_generation: u64,
    pending: Option<JoinHandle<()>>,
    consecutive_warnings: u32,
    is_alerting: bool,
    dormant: bool,
}

impl HeartbeatStatus {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            last_heartbeat_at: Utc::now(),
            beats: 0,
            timer_generation: 0,
            pending: None,
            consecutive_warnings: 0,
            is_alerting: false,
            dormant: false,
        }
    }

    fn state(&self) -> EntityState {
        if self.beats == 0 {
            EntityState::Unseen
        } else if self.is_alerting {
            EntityState::Escalating
        } else if self.dormant {
            EntityState::Dormant
        } else {
            EntityState::Healthy
        }
    }

    fn view(&self) -> HeartbeatView {
        HeartbeatView {
            name: self.name.clone(),
            state: self.state(),
            last_heartbeat: self.last_heartbeat_at,
            consecutive_warnings: self.consecutive_warnings,
        }
    }
}

type Record = Arc<Mutex<HeartbeatStatus>>;

/// Liveness watchdog over named entities
pub struct HeartbeatWatchdog {
    records: RwLock<HashMap<String, Record>>,
    settings: WatchdogSettings,
    notifier: Arc<dyn Notifier>,
}

impl HeartbeatWatchdog {
    pub fn new(settings: WatchdogSettings, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(HashMap::new()),
            settings,
            notifier,
        })
    }

    pub fn settings(&self) -> WatchdogSettings {
        self.settings
    }

    /// Record a heartbeat of `name` and re-arm its timer
    #[instrument(skip(self))]
    pub async fn record_heartbeat(
        self: &Arc<Self>,
        name: &str,
    ) -> Result<HeartbeatAck, HeartbeatError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HeartbeatError::EmptyName);
        }

        let record = self.record(name).await;
        let mut status = record.lock().await;

        let (_, action) = transition(status.state(), WatchEvent::HeartbeatReceived);
        debug_assert_eq!(action, WatchAction::Rearm);

        if let Some(pending) = status.pending.take() {
            pending.abort();
        }
        if status.is_alerting {
            info!("{name} recovered after {} warning(s)", status.consecutive_warnings);
        }

        status.last_heartbeat_at = Utc::now();
        status.beats += 1;
        status.is_alerting = false;
        status.dormant = false;
        status.consecutive_warnings = 0;
        self.arm(&record, &mut status);

        trace!("heartbeat #{} from {name}", status.beats);

        let next_check = status.last_heartbeat_at
            + chrono::Duration::from_std(self.settings.interval)
                .unwrap_or_else(|_| chrono::Duration::zero());

        Ok(HeartbeatAck {
            last_heartbeat: status.last_heartbeat_at,
            next_check,
        })
    }

    /// Deliver a `TimeoutFired` event for `name` right away
    ///
    /// Runs the escalation burst to completion if one starts. Returns `false`
    /// when the event was ignored (unknown entity, burst already running,
    /// dormant).
    pub async fn fire_timeout(self: &Arc<Self>, name: &str) -> bool {
        let Some(record) = self.records.read().await.get(name).cloned() else {
            return false;
        };
        self.on_timeout(record, None).await
    }

    pub async fn status(&self, name: &str) -> Option<HeartbeatView> {
        let record = self.records.read().await.get(name).cloned()?;
        let status = record.lock().await;
        Some(status.view())
    }

    /// Views of all entities, sorted by name
    pub async fn statuses(&self) -> Vec<HeartbeatView> {
        let records: Vec<Record> = self.records.read().await.values().cloned().collect();

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(record.lock().await.view());
        }
        views.sort_by(|a, b| a.name.cmp(&b.name));
        views
    }

    async fn record(&self, name: &str) -> Record {
        if let Some(record) = self.records.read().await.get(name) {
            return Arc::clone(record);
        }

        let mut records = self.records.write().await;
        Arc::clone(
            records
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(HeartbeatStatus::new(name)))),
        )
    }

    /// Spawn a timer owned by `status`, replacing the previous one
    ///
    /// The previous handle is detached, not aborted: it may be the task that
    /// is calling this. A detached timer that fires later sees a stale
    /// generation and does nothing.
    fn arm(self: &Arc<Self>, record: &Record, status: &mut HeartbeatStatus) {
        status.timer_generation += 1;
        let generation = status.timer_generation;
        let interval = self.settings.interval;
        let watchdog = Arc::clone(self);
        let record = Arc::clone(record);

        status.pending = Some(tokio::spawn(async move {
            sleep(interval).await;
            watchdog.on_timeout(record, Some(generation)).await;
        }));
    }

    /// Handle a `TimeoutFired` event, running the burst if one starts
    async fn on_timeout(self: &Arc<Self>, record: Record, generation: Option<u64>) -> bool {
        let (name, started_at_beat) = {
            let mut status = record.lock().await;

            if generation.is_some_and(|g| g != status.timer_generation) {
                trace!("stale timer for {}", status.name);
                return false;
            }

            let (next, action) = transition(status.state(), WatchEvent::TimeoutFired);
            if action != WatchAction::Escalate {
                trace!("timeout for {} ignored in state {:?}", status.name, status.state());
                return false;
            }

            debug_assert_eq!(next, EntityState::Escalating);
            status.is_alerting = true;
            (status.name.clone(), status.beats)
        };

        self.escalate(&record, &name, started_at_beat).await;
        true
    }

    #[instrument(skip(self, record))]
    async fn escalate(self: &Arc<Self>, record: &Record, name: &str, started_at_beat: u64) {
        let interval = self.settings.interval;
        let mut recovered = false;

        for attempt in 1..=self.settings.warn_count {
            let last_heartbeat = {
                let mut status = record.lock().await;
                if status.beats != started_at_beat {
                    recovered = true;
                    break;
                }
                status.consecutive_warnings = attempt;
                status.last_heartbeat_at
            };

            let message = format!(
                "⚠️ Health check timeout for {name}, last heartbeat at {}",
                last_heartbeat.to_rfc3339()
            );
            warn!(attempt, "{message}");

            if let Err(e) = self.notifier.notify(&message).await {
                error!(attempt, "failed to send heartbeat alert: {e}");
            }

            sleep(interval).await;

            if record.lock().await.beats != started_at_beat {
                recovered = true;
                break;
            }
        }

        let mut status = record.lock().await;
        if status.beats != started_at_beat {
            // a fresh heartbeat already owns the record
            debug!("{name} recovered during escalation");
            return;
        }

        status.is_alerting = false;
        if recovered {
            return;
        }

        if self.settings.rearm_after_escalation {
            debug!("escalation for {name} exhausted, re-arming");
            self.arm(record, &mut status);
        } else {
            status.pending = None;
            status.dormant = true;
            warn!("escalation for {name} exhausted, not watched until its next heartbeat");
        }
    }
}

impl fmt::Debug for HeartbeatWatchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatWatchdog")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
