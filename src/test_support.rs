//! Fakes shared by the unit tests

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::exchange::{
    ConstituentSnapshot, Exchange, FetchError, FetchResult, MarketSource, VolumeTicker,
};
use crate::notify::{Notifier, NotifyError};

/// Notifier that remembers every message and when it was sent
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Instant, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Make every following `notify` call fail (messages are still recorded)
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<(Instant, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|(_, m)| m.clone()).collect()
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .await
            .push((Instant::now(), message.to_string()));

        if self.failing.load(Ordering::SeqCst) {
            Err(NotifyError::Rejected {
                channel: "test",
                status: 500,
            })
        } else {
            Ok(())
        }
    }
}

/// Market source serving whatever the test put in
#[derive(Debug)]
pub struct ScriptedSource {
    exchange: Exchange,
    volumes: StdMutex<FetchResult<Vec<VolumeTicker>>>,
    constituents: StdMutex<HashMap<String, FetchResult<ConstituentSnapshot>>>,
    pub volume_calls: AtomicUsize,
    pub constituent_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            volumes: StdMutex::new(Ok(vec![])),
            constituents: StdMutex::new(HashMap::new()),
            volume_calls: AtomicUsize::new(0),
            constituent_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_volumes(&self, volumes: FetchResult<Vec<VolumeTicker>>) {
        *self.volumes.lock().unwrap() = volumes;
    }

    pub fn set_constituents(&self, symbol: &str, snapshot: FetchResult<ConstituentSnapshot>) {
        self.constituents
            .lock()
            .unwrap()
            .insert(symbol.to_string(), snapshot);
    }
}

#[async_trait]
impl MarketSource for ScriptedSource {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    async fn fetch_volumes(&self) -> FetchResult<Vec<VolumeTicker>> {
        self.volume_calls.fetch_add(1, Ordering::SeqCst);
        self.volumes.lock().unwrap().clone()
    }

    async fn fetch_constituents(&self, symbol: &str) -> FetchResult<ConstituentSnapshot> {
        self.constituent_calls.fetch_add(1, Ordering::SeqCst);
        self.constituents
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Upstream(format!("no script for {symbol}"))))
    }
}
