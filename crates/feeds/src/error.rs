//! Error types for feed operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching transactions or market data.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Missing field in response: {0}")]
    MissingField(&'static str),

    #[error("No market found for {0}")]
    NoMarket(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout(err.to_string())
        } else if err.is_decode() {
            FeedError::ParseError(err.to_string())
        } else {
            FeedError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl FeedError {
    /// Returns true if this error is transient and likely to succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::Http(_) | FeedError::Timeout(_) => true,
            FeedError::Status { status, .. } => *status == 429 || *status >= 500,
            FeedError::ParseError(_) | FeedError::MissingField(_) | FeedError::NoMarket(_) => false,
        }
    }

    /// Returns true if the API rejected the request for rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FeedError::Status { status: 429, .. })
    }

    /// Returns a suggested retry delay for this error type, if applicable.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            FeedError::Status { status: 429, .. } => Some(Duration::from_secs(30)),
            FeedError::Http(_) => Some(Duration::from_secs(5)),
            FeedError::Timeout(_) => Some(Duration::from_secs(2)),
            FeedError::Status { status, .. } if *status >= 500 => Some(Duration::from_secs(5)),
            _ => None,
        }
    }
}

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
