//! API shared state

use std::sync::Arc;

use crate::engine::Engine;
use crate::monitors::heartbeat::HeartbeatWatchdog;
use crate::pairs::PairRegistry;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Receives heartbeats
    pub watchdog: Arc<HeartbeatWatchdog>,

    /// Receives pair registrations
    pub pairs: Arc<PairRegistry>,
}

impl ApiState {
    pub fn new(watchdog: Arc<HeartbeatWatchdog>, pairs: Arc<PairRegistry>) -> Self {
        Self { watchdog, pairs }
    }

    pub fn from_engine(engine: &Engine) -> Self {
        Self::new(Arc::clone(&engine.watchdog), Arc::clone(&engine.pairs))
    }
}
