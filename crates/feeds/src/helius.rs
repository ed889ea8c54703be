//! Transaction-listing fetcher for the Helius enhanced transactions API.
//!
//! One bounded request per poll cycle; no pagination and no retries. Transport
//! failures are returned to the caller, malformed bodies become an empty batch.

use crate::error::{FeedError, FeedResult};
use async_trait::async_trait;
use buybot_core::TransactionRecord;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Keys under which an object-shaped response may wrap the transaction list.
const WRAPPER_KEYS: [&str; 4] = ["transactions", "result", "data", "pairs"];

/// Source of recent transactions for the tracked token.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetch the most recent transactions (at most one page).
    async fn fetch(&self) -> FeedResult<Vec<TransactionRecord>>;

    /// Drop and rebuild the underlying network session.
    fn reset_session(&mut self) {}
}

/// Configuration for the Helius fetcher.
#[derive(Debug, Clone)]
pub struct HeliusConfig {
    pub api_key: String,
    pub base_url: String,
    /// Token mint to query.
    pub mint: String,
    /// Page size, clamped to [`HeliusConfig::MAX_LIMIT`].
    pub limit: usize,
    pub timeout: Duration,
}

impl HeliusConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.helius.xyz";
    pub const MAX_LIMIT: usize = 50;

    pub fn new(api_key: impl Into<String>, mint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            mint: mint.into(),
            limit: Self::MAX_LIMIT,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Effective page size: between 1 and 50.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }

    /// Request URL including the API key.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v0/transactions/?api-key={}",
            self.base_url.trim_end_matches('/'),
            self.api_key
        )
    }

    /// Request body filtering by mint.
    pub fn payload(&self) -> Value {
        json!({
            "query": { "tokenMint": self.mint },
            "limit": self.effective_limit(),
        })
    }
}

/// Helius REST fetcher.
pub struct HeliusFetcher {
    config: HeliusConfig,
    client: reqwest::Client,
}

impl HeliusFetcher {
    pub fn new(config: HeliusConfig) -> FeedResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl TransactionSource for HeliusFetcher {
    async fn fetch(&self) -> FeedResult<Vec<TransactionRecord>> {
        let response = self
            .client
            .post(self.config.endpoint())
            .json(&self.config.payload())
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let records = decode_response(status, &text, self.config.effective_limit())?;

        debug!(count = records.len(), "Helius: fetched transactions");
        Ok(records)
    }

    fn reset_session(&mut self) {
        match build_client(self.config.timeout) {
            Ok(client) => {
                self.client = client;
                debug!("Helius: HTTP session rebuilt");
            }
            Err(e) => warn!("Helius: failed to rebuild HTTP session: {}", e),
        }
    }
}

pub(crate) fn build_client(timeout: Duration) -> FeedResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(FeedError::from)
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Reject non-2xx responses, keeping the head of the body for diagnostics.
pub(crate) fn check_status(status: u16, body: &str) -> FeedResult<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(FeedError::Status {
            status,
            body: truncate(body, 200),
        })
    }
}

/// Turn a raw Helius response into at most `limit` records.
///
/// Non-2xx statuses are errors; a body that is not JSON is an empty batch.
pub fn decode_response(status: u16, body: &str, limit: usize) -> FeedResult<Vec<TransactionRecord>> {
    check_status(status, body)?;

    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            warn!("Helius: unparseable response body: {}", e);
            return Ok(Vec::new());
        }
    };
    let mut records = extract_records(json);
    records.truncate(limit);
    Ok(records)
}

/// Pull transaction records out of a response body.
///
/// Accepts a bare array or an object wrapping one; any other shape yields an
/// empty batch. Array elements that are not transaction objects are skipped.
pub fn extract_records(body: Value) -> Vec<TransactionRecord> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let wrapped = WRAPPER_KEYS.iter().find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            });
            match wrapped {
                Some(items) => items,
                None => {
                    debug!(keys = ?map.keys().collect::<Vec<_>>(), "Unrecognized transaction response shape");
                    return Vec::new();
                }
            }
        }
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<TransactionRecord>(item) {
            Ok(tx) => Some(tx),
            Err(e) => {
                debug!(error = %e, "Skipping malformed transaction");
                None
            }
        })
        .collect()
}

/// Scripted transaction source for tests and offline runs.
///
/// Scripted batches are served in order; once the script is exhausted the
/// default batch is returned on every fetch. Clones share state.
#[derive(Clone, Default)]
pub struct MockTransactionSource {
    script: Arc<Mutex<VecDeque<Result<Vec<TransactionRecord>, String>>>>,
    default_batch: Arc<Mutex<Vec<TransactionRecord>>>,
    fetches: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl MockTransactionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful batch.
    pub fn push_batch(&self, batch: Vec<TransactionRecord>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(batch));
        }
    }

    /// Queue a transport failure.
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(message.into()));
        }
    }

    /// Batch returned once the script is exhausted.
    pub fn set_default_batch(&self, batch: Vec<TransactionRecord>) {
        if let Ok(mut default_batch) = self.default_batch.lock() {
            *default_batch = batch;
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSource for MockTransactionSource {
    async fn fetch(&self) -> FeedResult<Vec<TransactionRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(message)) => Err(FeedError::Http(message)),
            None => Ok(self
                .default_batch
                .lock()
                .map(|b| b.clone())
                .unwrap_or_default()),
        }
    }

    fn reset_session(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}
