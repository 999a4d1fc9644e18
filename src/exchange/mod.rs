//! Exchange market data sources
//!
//! Every supported venue is a variant of [`Exchange`]. The data needed by the
//! monitors is fetched through the [`MarketSource`] trait, and the
//! [`ExchangeRegistry`] maps each variant to its implementation once at
//! startup. A variant without a registered source is reported as unsupported
//! instead of being silently ignored.

pub mod binance;
pub mod error;
pub mod gate;
pub mod types;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use error::{FetchError, FetchResult};
pub use types::{Constituent, ConstituentSnapshot, VolumeTicker};

/// Exchanges the monitors know how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Gate,
    Binance,
}

impl Exchange {
    pub const ALL: [Exchange; 2] = [Exchange::Gate, Exchange::Binance];

    /// Lowercase name, also used as cache key prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Gate => "gate",
            Exchange::Binance => "binance",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an exchange name that is not a known variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownExchange(pub String);

impl fmt::Display for UnknownExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown exchange: '{}'", self.0)
    }
}

impl std::error::Error for UnknownExchange {}

impl FromStr for Exchange {
    type Err = UnknownExchange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Exchange::ALL
            .into_iter()
            .find(|exchange| exchange.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownExchange(s.to_string()))
    }
}

/// Market data needed by the volume and composition monitors
#[async_trait]
pub trait MarketSource: Send + Sync {
    fn exchange(&self) -> Exchange;

    /// 24h volume of every perpetual contract on the exchange
    async fn fetch_volumes(&self) -> FetchResult<Vec<VolumeTicker>>;

    /// Current index constituents of `symbol`
    async fn fetch_constituents(&self, symbol: &str) -> FetchResult<ConstituentSnapshot>;
}

/// Static mapping from exchange to its market data source
#[derive(Clone, Default)]
pub struct ExchangeRegistry {
    sources: HashMap<Exchange, Arc<dyn MarketSource>>,
}

impl ExchangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the public REST clients of every supported exchange
    pub fn with_public_clients(client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.insert(Arc::new(gate::GateClient::new(client.clone())));
        registry.insert(Arc::new(binance::BinanceClient::new(client)));
        registry
    }

    pub fn insert(&mut self, source: Arc<dyn MarketSource>) {
        self.sources.insert(source.exchange(), source);
    }

    pub fn get(&self, exchange: Exchange) -> Option<Arc<dyn MarketSource>> {
        self.sources.get(&exchange).cloned()
    }

    pub fn supports(&self, exchange: Exchange) -> bool {
        self.sources.contains_key(&exchange)
    }
}

impl fmt::Debug for ExchangeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exchanges: Vec<_> = self.sources.keys().collect();
        exchanges.sort();
        f.debug_struct("ExchangeRegistry")
            .field("exchanges", &exchanges)
            .finish()
    }
}

/// HTTP client shared by the exchange sources
pub fn create_market_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}

/// GET `url` and decode the JSON body
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> FetchResult<T> {
    trace!("requesting {url} {query:?}");

    let response = client
        .get(url)
        .query(query)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| FetchError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Request(e.to_string()))?;

    if !status.is_success() {
        return Err(FetchError::Status {
            code: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
}
