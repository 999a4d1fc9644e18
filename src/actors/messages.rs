//! Message types for actor communication
//!
//! Commands are sent to one actor through its mpsc channel; replies travel
//! back on a oneshot channel carried inside the command.

use serde::Serialize;
use tokio::sync::oneshot;

use crate::exchange::Exchange;
use crate::monitors::balance::{BalanceError, BalanceReading};

/// Commands that can be sent to the MonitorScheduler
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run one cycle now instead of waiting for the cycle delay
    ///
    /// The volume check is included regardless of when it last ran.
    RunNow {
        respond_to: oneshot::Sender<CycleReport>,
    },

    /// Stop after the cycle in progress
    Shutdown,
}

/// Summary of one scheduler cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Exchanges that had symbols of interest
    pub exchanges: Vec<Exchange>,

    /// Exchanges skipped because no market source is registered
    pub unsupported: Vec<Exchange>,

    /// `(exchange, symbol)` whose index composition changed
    pub composition_changes: Vec<(Exchange, String)>,

    /// `(exchange, symbol)` included in a volume alert
    pub volume_alerts: Vec<(Exchange, String)>,

    /// Whether the volume check was due in this cycle
    pub volume_checked: bool,
}

/// Commands that can be sent to the BalanceActor
#[derive(Debug)]
pub enum BalanceCommand {
    /// Check every configured wallet now
    CheckNow {
        respond_to: oneshot::Sender<Vec<Result<BalanceReading, BalanceError>>>,
    },

    Shutdown,
}
