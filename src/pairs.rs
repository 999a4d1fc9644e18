//! Registration of the pairs of interest
//!
//! A client posts the pairs it trades; both legs of every pair become symbols
//! of interest on their exchange. The symbol set of an exchange is replaced
//! as a whole by every registration that mentions that exchange, and a volume
//! check of the new set is started right away.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::cache::SnapshotCache;
use crate::exchange::{Exchange, UnknownExchange};
use crate::monitors::volume::VolumeMonitor;

/// Exchange to symbols of interest
pub type SymbolSets = SnapshotCache<Exchange, BTreeSet<String>>;

/// One leg of a pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    #[serde(default)]
    pub name: String,
    pub exchange: String,
    pub symbol: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ts: i64,
    pub a: SymbolInfo,
    pub b: SymbolInfo,
}

impl PairInfo {
    pub fn legs(&self) -> [&SymbolInfo; 2] {
        [&self.a, &self.b]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    UnknownExchange(String),
    EmptySymbol { exchange: String },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::UnknownExchange(name) => write!(f, "unknown exchange: '{name}'"),
            RegistrationError::EmptySymbol { exchange } => {
                write!(f, "empty symbol for exchange '{exchange}'")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

impl From<UnknownExchange> for RegistrationError {
    fn from(e: UnknownExchange) -> Self {
        RegistrationError::UnknownExchange(e.0)
    }
}

/// Symbol sets stored by a registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationAck {
    pub exchanges: BTreeMap<Exchange, BTreeSet<String>>,
}

pub struct PairRegistry {
    symbols: Arc<SymbolSets>,
    volume: Arc<VolumeMonitor>,
}

impl PairRegistry {
    pub fn new(symbols: Arc<SymbolSets>, volume: Arc<VolumeMonitor>) -> Self {
        Self { symbols, volume }
    }

    /// Validate, dedup and store the legs of `pairs`
    ///
    /// Nothing is stored when any leg is invalid.
    #[instrument(skip(self, pairs), fields(pairs = pairs.len()))]
    pub async fn register_pairs(
        &self,
        pairs: &[PairInfo],
    ) -> Result<RegistrationAck, RegistrationError> {
        let grouped = group_legs(pairs.iter().flat_map(|p| p.legs()))?;

        for (exchange, symbols) in &grouped {
            debug!("{exchange}: {} symbol(s) of interest", symbols.len());
            self.symbols.set(*exchange, symbols.clone()).await;

            let volume = Arc::clone(&self.volume);
            let exchange = *exchange;
            let symbols = symbols.clone();
            tokio::spawn(async move {
                volume.check(exchange, &symbols).await;
            });
        }

        info!("registered {} pair(s) on {} exchange(s)", pairs.len(), grouped.len());

        Ok(RegistrationAck { exchanges: grouped })
    }

    /// Copy of the current symbol sets
    pub async fn symbols(&self) -> BTreeMap<Exchange, BTreeSet<String>> {
        self.symbols.get_all().await.into_iter().collect()
    }
}

/// Group legs by exchange, rejecting unknown exchanges and empty symbols
fn group_legs<'a>(
    legs: impl IntoIterator<Item = &'a SymbolInfo>,
) -> Result<BTreeMap<Exchange, BTreeSet<String>>, RegistrationError> {
    let mut grouped: BTreeMap<Exchange, BTreeSet<String>> = BTreeMap::new();

    for leg in legs {
        let exchange: Exchange = leg.exchange.parse()?;
        let symbol = leg.symbol.trim();
        if symbol.is_empty() {
            return Err(RegistrationError::EmptySymbol {
                exchange: leg.exchange.clone(),
            });
        }
        grouped.entry(exchange).or_default().insert(symbol.to_string());
    }

    Ok(grouped)
}
