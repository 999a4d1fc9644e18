//! Gate USDT perpetual futures

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::{
    Constituent, ConstituentSnapshot, Exchange, FetchError, FetchResult, MarketSource,
    VolumeTicker, get_json,
};

const API_BASE: &str = "https://api.gateio.ws";

// the public API has no constituent weights, the web endpoint does
const WEB_BASE: &str = "https://www.gate.com";

#[derive(Debug, Deserialize)]
struct GateTicker {
    contract: String,
    #[serde(default)]
    volume_24h_settle: String,
}

#[derive(Debug, Deserialize)]
struct GateBreakdownResponse {
    #[serde(default)]
    message: String,
    data: Option<GateBreakdown>,
}

#[derive(Debug, Deserialize)]
struct GateBreakdown {
    #[serde(default)]
    index: String,
    #[serde(default)]
    constituents: Vec<GateConstituent>,
}

#[derive(Debug, Deserialize)]
struct GateConstituent {
    symbol: String,
    exchange: String,
    #[serde(default)]
    weight: String,
}

#[derive(Debug, Clone)]
pub struct GateClient {
    client: reqwest::Client,
    api_base: String,
    web_base: String,
}

impl GateClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_urls(client, API_BASE, WEB_BASE)
    }

    pub fn with_base_urls(
        client: reqwest::Client,
        api_base: impl Into<String>,
        web_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            web_base: web_base.into(),
        }
    }
}

#[async_trait]
impl MarketSource for GateClient {
    fn exchange(&self) -> Exchange {
        Exchange::Gate
    }

    #[instrument(skip(self))]
    async fn fetch_volumes(&self) -> FetchResult<Vec<VolumeTicker>> {
        let url = format!("{}/api/v4/futures/usdt/tickers", self.api_base);
        let tickers: Vec<GateTicker> = get_json(&self.client, &url, &[]).await?;

        Ok(tickers
            .into_iter()
            .map(|t| VolumeTicker::new(t.contract, t.volume_24h_settle))
            .collect())
    }

    #[instrument(skip(self))]
    async fn fetch_constituents(&self, symbol: &str) -> FetchResult<ConstituentSnapshot> {
        let url = format!("{}/apiw/v2/futures/common/index/breakdown", self.web_base);
        let response: GateBreakdownResponse =
            get_json(&self.client, &url, &[("index", symbol)]).await?;

        let Some(data) = response.data else {
            return Err(FetchError::Upstream(format!(
                "no breakdown for {symbol}: {}",
                response.message
            )));
        };

        let index = if data.index.is_empty() {
            symbol.to_string()
        } else {
            data.index
        };

        Ok(ConstituentSnapshot::new(
            index,
            data.constituents
                .into_iter()
                .map(|c| Constituent::new(c.exchange, c.symbol, c.weight))
                .collect(),
        ))
    }
}
