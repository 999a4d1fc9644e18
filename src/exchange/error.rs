//! Errors returned by market data sources

use std::fmt;

pub type FetchResult<T> = Result<T, FetchError>;

/// Failure while fetching data from an exchange
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, timeout or body read failure
    Request(String),

    /// Non-2xx response
    Status { code: u16, body: String },

    /// Response body did not have the expected shape
    Decode(String),

    /// The exchange answered but reported an error or no data
    Upstream(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Request(msg) => write!(f, "request failed: {msg}"),
            FetchError::Status { code, body } => {
                write!(f, "request failed with status code {code}: {body}")
            }
            FetchError::Decode(msg) => write!(f, "failed to decode response: {msg}"),
            FetchError::Upstream(msg) => write!(f, "exchange reported an error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}
