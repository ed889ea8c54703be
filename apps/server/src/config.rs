//! Application configuration from environment variables.

use buybot_alerts::{NotifierConfig, DEFAULT_EMOJI};
use buybot_feeds::HeliusConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub helius_api_key: String,
    pub helius_api_url: String,
    /// Absent only in dry-run mode.
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub mint: String,
    /// Minimum buy size in USD that triggers an alert.
    pub min_usd: f64,
    pub image_path: Option<PathBuf>,
    pub fetch_limit: usize,
    pub poll_interval: Duration,
    /// Pause after each alert.
    pub alert_delay: Duration,
    pub error_backoff: Duration,
    /// Consecutive failed cycles tolerated before HTTP sessions are rebuilt.
    pub max_consecutive_errors: u32,
    /// Refresh prices every N cycles.
    pub price_refresh_cycles: u64,
    pub stats_interval_cycles: u64,
    pub seen_capacity: usize,
    /// Symbol shown until market data loads.
    pub token_symbol: String,
    /// SOL price used until the first successful refresh.
    pub default_sol_price: f64,
    pub alert_emoji: String,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub const DEFAULT_MIN_USD: f64 = 20.0;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Load configuration from the process environment.
    pub fn from_env(dry_run: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), dry_run)
    }

    /// Build configuration from a key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F, dry_run: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let telegram = |key: &'static str| {
            if dry_run {
                Ok(get(key))
            } else {
                required(key).map(Some)
            }
        };

        Ok(Self {
            helius_api_key: required("HELIUS_API_KEY")?,
            helius_api_url: get("HELIUS_API_URL")
                .unwrap_or_else(|| HeliusConfig::DEFAULT_BASE_URL.to_string()),
            telegram_bot_token: telegram("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: telegram("TELEGRAM_CHAT_ID")?,
            mint: required("TARGET_TOKEN_MINT")?,
            min_usd: parse_amount_or(&get, "MIN_USD_VALUE", Self::DEFAULT_MIN_USD)?,
            image_path: get("IMAGE_PATH").map(PathBuf::from),
            fetch_limit: parse_or(&get, "FETCH_LIMIT", HeliusConfig::MAX_LIMIT)?
                .clamp(1, HeliusConfig::MAX_LIMIT),
            poll_interval: Duration::from_secs(parse_or(&get, "POLL_INTERVAL_SECS", 3)?),
            alert_delay: Duration::from_millis(parse_or(&get, "ALERT_DELAY_MS", 1200)?),
            error_backoff: Duration::from_secs(parse_or(&get, "ERROR_BACKOFF_SECS", 5)?),
            max_consecutive_errors: parse_or(&get, "MAX_CONSECUTIVE_ERRORS", 5)?,
            price_refresh_cycles: parse_or(&get, "PRICE_REFRESH_CYCLES", 20u64)?.max(1),
            stats_interval_cycles: parse_or(&get, "STATS_INTERVAL_CYCLES", 100u64)?.max(1),
            seen_capacity: parse_or(&get, "SEEN_CAPACITY", 12_000usize)?.max(1),
            token_symbol: get("TOKEN_SYMBOL").unwrap_or_else(|| "TOKEN".to_string()),
            default_sol_price: parse_amount_or(&get, "DEFAULT_SOL_PRICE", 150.0)?,
            alert_emoji: get("ALERT_EMOJI").unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn helius(&self) -> HeliusConfig {
        let mut helius = HeliusConfig::new(&self.helius_api_key, &self.mint)
            .with_base_url(&self.helius_api_url)
            .with_limit(self.fetch_limit);
        helius.timeout = self.request_timeout;
        helius
    }

    pub fn notifier(&self) -> NotifierConfig {
        NotifierConfig {
            image_path: self.image_path.clone(),
            emoji: self.alert_emoji.clone(),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Accept only finite, non-negative USD amounts.
pub fn usd_amount(key: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
    }
}

fn parse_amount_or<G>(get: &G, key: &'static str, default: f64) -> Result<f64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, key, default)?;
    usd_amount(key, value).map_err(|_| ConfigError::Invalid {
        key,
        value: get(key).unwrap_or_default(),
    })
}
