//! Binance USD-M futures

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::{
    Constituent, ConstituentSnapshot, Exchange, FetchResult, MarketSource, VolumeTicker, get_json,
};

const API_BASE: &str = "https://fapi.binance.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker {
    symbol: String,
    // quote volume is denominated in USDT, comparable to the USD floor
    #[serde(default)]
    quote_volume: String,
}

#[derive(Debug, Deserialize)]
struct BinanceConstituentsResponse {
    symbol: String,
    #[serde(default)]
    constituents: Vec<BinanceConstituent>,
}

#[derive(Debug, Deserialize)]
struct BinanceConstituent {
    exchange: String,
    symbol: String,
    #[serde(default)]
    weight: String,
}

#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: reqwest::Client,
    api_base: String,
}

impl BinanceClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl MarketSource for BinanceClient {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    #[instrument(skip(self))]
    async fn fetch_volumes(&self) -> FetchResult<Vec<VolumeTicker>> {
        let url = format!("{}/fapi/v1/ticker/24hr", self.api_base);
        let tickers: Vec<BinanceTicker> = get_json(&self.client, &url, &[]).await?;

        Ok(tickers
            .into_iter()
            .map(|t| VolumeTicker::new(t.symbol, t.quote_volume))
            .collect())
    }

    #[instrument(skip(self))]
    async fn fetch_constituents(&self, symbol: &str) -> FetchResult<ConstituentSnapshot> {
        let url = format!("{}/fapi/v1/constituents", self.api_base);
        let response: BinanceConstituentsResponse =
            get_json(&self.client, &url, &[("symbol", symbol)]).await?;

        Ok(ConstituentSnapshot::new(
            response.symbol,
            response
                .constituents
                .into_iter()
                .map(|c| Constituent::new(c.exchange, c.symbol, c.weight))
                .collect(),
        ))
    }
}
