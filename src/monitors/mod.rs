//! Alerting monitors
//!
//! - [`heartbeat`]: liveness watchdog with escalating re-alerts
//! - [`volume`]: 24h volume floor with a capped number of repeat alerts
//! - [`composition`]: index constituent change detection
//! - [`balance`]: native wallet balance bounds over JSON-RPC

pub mod balance;
pub mod composition;
pub mod heartbeat;
pub mod volume;

use std::fmt;

use crate::exchange::FetchError;

/// Which monitor a throttle counter belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorKind {
    Volume,
}

impl MonitorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorKind::Volume => "vol",
        }
    }
}

/// Key of a notification throttle counter
///
/// Rendered as `vol:gate_BTC_USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThrottleKey {
    pub kind: MonitorKind,
    pub exchange: String,
    pub symbol: String,
}

impl ThrottleKey {
    pub fn new(kind: MonitorKind, exchange: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            kind,
            exchange: exchange.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for ThrottleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}_{}", self.kind.as_str(), self.exchange, self.symbol)
    }
}

/// Result of running one monitor against one exchange
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome<R> {
    /// No market source is registered for the exchange
    Unsupported,

    /// Market data could not be fetched, nothing was evaluated
    Failed(FetchError),

    Completed(R),
}

impl<R> CheckOutcome<R> {
    pub fn report(&self) -> Option<&R> {
        match self {
            CheckOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}
