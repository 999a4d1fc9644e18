//! Native wallet balance monitor
//!
//! Balances are read with `eth_getBalance` from an EVM JSON-RPC endpoint.
//! Endpoints of a chain are used round-robin so a single slow node does not
//! stall every check.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, instrument, trace, warn};

use crate::config::{RpcConfig, TokenConfig};
use crate::notify::Notifier;

/// Public BNB Smart Chain endpoints
pub const BSC_RPC: [&str; 5] = [
    "https://bsc-dataseed.bnbchain.org",
    "https://bsc-dataseed.nariox.org",
    "https://bsc-dataseed.defibit.io",
    "https://bsc-dataseed.ninicoin.io",
    "https://bsc.nodereal.io",
];

const BSC_CHAIN_ID: &str = "56";

const NATIVE_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq)]
pub enum BalanceError {
    EmptyAddress,

    /// No endpoint is known for the chain
    NoEndpoint(String),

    Request(String),

    Status(u16),

    Decode(String),

    IdMismatch { expected: String, got: Value },

    /// The node answered with an `error` object
    Rpc { code: i64, message: String },

    MissingResult,

    InvalidAmount(String),
}

impl fmt::Display for BalanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceError::EmptyAddress => write!(f, "address cannot be empty"),
            BalanceError::NoEndpoint(chain) => write!(f, "no rpc endpoint for chain {chain}"),
            BalanceError::Request(msg) => write!(f, "rpc request failed: {msg}"),
            BalanceError::Status(code) => write!(f, "rpc request failed with status code {code}"),
            BalanceError::Decode(msg) => write!(f, "failed to decode rpc response: {msg}"),
            BalanceError::IdMismatch { expected, got } => {
                write!(f, "id mismatch: expected {expected}, got {got}")
            }
            BalanceError::Rpc { code, message } => write!(f, "rpc error {code}: {message}"),
            BalanceError::MissingResult => write!(f, "balance not found"),
            BalanceError::InvalidAmount(raw) => write!(f, "invalid hex amount: '{raw}'"),
        }
    }
}

impl std::error::Error for BalanceError {}

/// Round-robin endpoint lists per chain id
#[derive(Debug, Default)]
pub struct RpcPool {
    endpoints: HashMap<String, Vec<String>>,
    cursors: Mutex<HashMap<String, usize>>,
}

impl RpcPool {
    /// Built-in endpoints with the configured ones put first
    pub fn new(overrides: &[RpcConfig]) -> Self {
        let mut endpoints: HashMap<String, Vec<String>> = HashMap::new();

        for rpc in overrides {
            endpoints
                .entry(rpc.chain_id.clone())
                .or_default()
                .extend(rpc.urls.iter().filter(|u| !u.trim().is_empty()).cloned());
        }
        endpoints
            .entry(BSC_CHAIN_ID.to_string())
            .or_default()
            .extend(BSC_RPC.iter().map(|u| u.to_string()));

        Self {
            endpoints,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// Pool with exactly the given endpoints and no built-in ones
    pub fn with_endpoints(chain_id: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            endpoints: HashMap::from([(chain_id.into(), urls)]),
            cursors: Mutex::new(HashMap::new()),
        }
    }

    pub fn next_endpoint(&self, chain_id: &str) -> Option<String> {
        let urls = self.endpoints.get(chain_id).filter(|urls| !urls.is_empty())?;

        let mut cursors = self.cursors.lock().unwrap_or_else(|e| e.into_inner());
        let cursor = cursors.entry(chain_id.to_string()).or_insert(0);
        let url = urls[*cursor % urls.len()].clone();
        *cursor = (*cursor + 1) % urls.len();
        Some(url)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Value,
    result: Option<String>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Minimal EVM JSON-RPC client
#[derive(Debug)]
pub struct EvmClient {
    client: reqwest::Client,
    pool: RpcPool,
    next_id: AtomicU64,
}

impl EvmClient {
    pub fn new(client: reqwest::Client, pool: RpcPool) -> Self {
        Self {
            client,
            pool,
            next_id: AtomicU64::new(1),
        }
    }

    /// Native token balance of `address`, in whole units
    #[instrument(skip(self))]
    pub async fn native_balance(&self, address: &str, chain_id: &str) -> Result<f64, BalanceError> {
        let url = self
            .pool
            .next_endpoint(chain_id)
            .ok_or_else(|| BalanceError::NoEndpoint(chain_id.to_string()))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();

        trace!("eth_getBalance via {url}");

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "jsonrpc": "2.0",
                "method": "eth_getBalance",
                "params": [address, "latest"],
                "id": id,
            }))
            .send()
            .await
            .map_err(|e| BalanceError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BalanceError::Status(response.status().as_u16()));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| BalanceError::Decode(e.to_string()))?;

        if body.id != Value::String(id.clone()) {
            return Err(BalanceError::IdMismatch {
                expected: id,
                got: body.id,
            });
        }
        if let Some(error) = body.error {
            return Err(BalanceError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let raw = body.result.ok_or(BalanceError::MissingResult)?;
        hex_to_amount(&raw, NATIVE_DECIMALS)
    }
}

/// Convert a hex integer (`0x...`) with `decimals` decimals to a float
///
/// The integer and fractional parts are split before converting so large
/// balances keep their integer precision.
pub fn hex_to_amount(raw: &str, decimals: u32) -> Result<f64, BalanceError> {
    let digits = raw
        .trim()
        .strip_prefix("0x")
        .or_else(|| raw.trim().strip_prefix("0X"))
        .unwrap_or(raw.trim());

    let value = if digits.is_empty() {
        0
    } else {
        u128::from_str_radix(digits, 16).map_err(|_| BalanceError::InvalidAmount(raw.to_string()))?
    };

    let scale = 10u128.pow(decimals);
    Ok((value / scale) as f64 + (value % scale) as f64 / scale as f64)
}

/// `0x1234**abcd(name)`
pub fn mask_address(address: &str, name: Option<&str>) -> String {
    let chars: Vec<char> = address.chars().collect();
    let mut masked = if chars.len() > 10 {
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}**{tail}")
    } else {
        address.to_string()
    };

    if let Some(name) = name.filter(|n| !n.is_empty()) {
        masked.push_str(&format!("({name})"));
    }
    masked
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceVerdict {
    WithinBounds,
    BelowMinimum,
    AboveMaximum,
}

pub fn evaluate(balance: f64, token: &TokenConfig) -> BalanceVerdict {
    if balance < token.min {
        BalanceVerdict::BelowMinimum
    } else if token.max.is_some_and(|max| balance > max) {
        BalanceVerdict::AboveMaximum
    } else {
        BalanceVerdict::WithinBounds
    }
}

/// Result of checking one configured wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceReading {
    pub label: String,
    pub chain_id: String,
    pub balance: f64,
    pub verdict: BalanceVerdict,
}

pub struct BalanceMonitor {
    evm: EvmClient,
    notifier: Arc<dyn Notifier>,
}

impl BalanceMonitor {
    pub fn new(evm: EvmClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { evm, notifier }
    }

    /// Check every token concurrently
    pub async fn check_all(&self, tokens: &[TokenConfig]) -> Vec<Result<BalanceReading, BalanceError>> {
        join_all(tokens.iter().map(|token| self.check_token(token))).await
    }

    #[instrument(skip(self, token), fields(chain = %token.chain_id))]
    pub async fn check_token(&self, token: &TokenConfig) -> Result<BalanceReading, BalanceError> {
        if token.address.trim().is_empty() {
            return Err(BalanceError::EmptyAddress);
        }

        let label = mask_address(&token.address, token.name.as_deref());
        let chain = &token.chain_id;

        let balance = self
            .evm
            .native_balance(&token.address, chain)
            .await
            .inspect_err(|e| error!("failed to get balance for {label} on chain {chain}: {e}"))?;

        info!("balance for {label} on chain {chain}: {balance:.6}");

        let verdict = evaluate(balance, token);
        let message = match verdict {
            BalanceVerdict::WithinBounds => None,
            BalanceVerdict::BelowMinimum => Some(format!(
                "⚠️ Balance for {label} on chain {chain} is below minimum {:.6}: {balance:.6}",
                token.min
            )),
            BalanceVerdict::AboveMaximum => Some(format!(
                "⚠️ Balance for {label} on chain {chain} is above maximum {:.6}: {balance:.6}",
                token.max.unwrap_or_default()
            )),
        };

        if let Some(message) = message {
            warn!("{message}");
            if let Err(e) = self.notifier.notify(&message).await {
                error!("failed to send balance alert: {e}");
            }
        }

        Ok(BalanceReading {
            label,
            chain_id: chain.clone(),
            balance,
            verdict,
        })
    }
}
