//! Market-data fetchers: token price from DexScreener, SOL/USD from CoinGecko.

use crate::error::{FeedError, FeedResult};
use crate::helius::{build_client, check_status};
use async_trait::async_trait;
use buybot_core::{value_as_f64, TokenMarket};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Source of token and reference-currency prices.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Price, market cap and symbol of the most liquid Solana pair for a mint.
    async fn fetch_token_market(&self, mint: &str) -> FeedResult<TokenMarket>;

    /// Current SOL price in USD.
    async fn fetch_sol_price(&self) -> FeedResult<f64>;

    /// Drop and rebuild the underlying network session.
    fn reset_session(&mut self) {}
}

/// HTTP client for DexScreener and CoinGecko.
pub struct MarketDataClient {
    client: reqwest::Client,
    timeout: Duration,
    dexscreener_url: String,
    coingecko_url: String,
}

impl MarketDataClient {
    pub const DEXSCREENER_URL: &'static str = "https://api.dexscreener.com/latest/dex/tokens";
    pub const COINGECKO_URL: &'static str =
        "https://api.coingecko.com/api/v3/simple/price?ids=solana&vs_currencies=usd";

    pub fn new(timeout: Duration) -> FeedResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            timeout,
            dexscreener_url: Self::DEXSCREENER_URL.to_string(),
            coingecko_url: Self::COINGECKO_URL.to_string(),
        })
    }

    async fn get_json(&self, url: &str) -> FeedResult<Value> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        decode_json(status, &text)
    }
}

/// Parse a market-data response; non-2xx statuses and non-JSON bodies are errors.
pub fn decode_json(status: u16, body: &str) -> FeedResult<Value> {
    check_status(status, body)?;
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl MarketDataSource for MarketDataClient {
    async fn fetch_token_market(&self, mint: &str) -> FeedResult<TokenMarket> {
        let url = format!("{}/{}", self.dexscreener_url, mint);
        let json = self.get_json(&url).await?;
        let market = parse_token_market(&json, mint)?;
        debug!(
            symbol = %market.symbol,
            price = market.price_usd,
            liquidity = market.liquidity_usd,
            "DexScreener: selected pair"
        );
        Ok(market)
    }

    async fn fetch_sol_price(&self) -> FeedResult<f64> {
        let json = self.get_json(&self.coingecko_url).await?;
        parse_sol_price(&json)
    }

    fn reset_session(&mut self) {
        match build_client(self.timeout) {
            Ok(client) => self.client = client,
            Err(e) => warn!("Market data: failed to rebuild HTTP session: {}", e),
        }
    }
}

/// Select the Solana pair with the deepest USD liquidity.
///
/// Response: {"pairs":[{"chainId":"solana","priceUsd":"0.0123","marketCap":123,
/// "fdv":456,"liquidity":{"usd":789},"baseToken":{"symbol":"TROUT"}}, ...]}
pub fn parse_token_market(json: &Value, mint: &str) -> FeedResult<TokenMarket> {
    let pairs = json["pairs"].as_array().ok_or(FeedError::MissingField("pairs"))?;

    let best = pairs
        .iter()
        .filter(|p| p["chainId"].as_str() == Some("solana"))
        .max_by(|a, b| {
            let la = value_as_f64(&a["liquidity"]["usd"]).unwrap_or(0.0);
            let lb = value_as_f64(&b["liquidity"]["usd"]).unwrap_or(0.0);
            la.total_cmp(&lb)
        })
        .ok_or_else(|| FeedError::NoMarket(mint.to_string()))?;

    let price_usd = value_as_f64(&best["priceUsd"]).ok_or(FeedError::MissingField("priceUsd"))?;
    let market_cap = value_as_f64(&best["marketCap"])
        .or_else(|| value_as_f64(&best["fdv"]))
        .unwrap_or(0.0);
    let symbol = best["baseToken"]["symbol"]
        .as_str()
        .ok_or(FeedError::MissingField("baseToken.symbol"))?
        .to_string();
    let liquidity_usd = value_as_f64(&best["liquidity"]["usd"]).unwrap_or(0.0);

    Ok(TokenMarket {
        price_usd,
        market_cap,
        symbol,
        liquidity_usd,
    })
}

/// Response: {"solana":{"usd":123.45}}
pub fn parse_sol_price(json: &Value) -> FeedResult<f64> {
    let price = value_as_f64(&json["solana"]["usd"]).ok_or(FeedError::MissingField("solana.usd"))?;
    if price <= 0.0 {
        return Err(FeedError::ParseError(format!("non-positive SOL price {}", price)));
    }
    Ok(price)
}

/// Scripted market-data source for tests. Clones share state.
#[derive(Clone, Default)]
pub struct MockMarketData {
    markets: Arc<Mutex<VecDeque<Result<TokenMarket, String>>>>,
    sol_prices: Arc<Mutex<VecDeque<Result<f64, String>>>>,
    resets: Arc<AtomicUsize>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_market(&self, market: TokenMarket) {
        if let Ok(mut q) = self.markets.lock() {
            q.push_back(Ok(market));
        }
    }

    pub fn push_market_error(&self, message: impl Into<String>) {
        if let Ok(mut q) = self.markets.lock() {
            q.push_back(Err(message.into()));
        }
    }

    pub fn push_sol_price(&self, price: f64) {
        if let Ok(mut q) = self.sol_prices.lock() {
            q.push_back(Ok(price));
        }
    }

    pub fn push_sol_error(&self, message: impl Into<String>) {
        if let Ok(mut q) = self.sol_prices.lock() {
            q.push_back(Err(message.into()));
        }
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for MockMarketData {
    async fn fetch_token_market(&self, mint: &str) -> FeedResult<TokenMarket> {
        match self.markets.lock().ok().and_then(|mut q| q.pop_front()) {
            Some(Ok(market)) => Ok(market),
            Some(Err(message)) => Err(FeedError::Http(message)),
            None => Err(FeedError::NoMarket(mint.to_string())),
        }
    }

    async fn fetch_sol_price(&self) -> FeedResult<f64> {
        match self.sol_prices.lock().ok().and_then(|mut q| q.pop_front()) {
            Some(Ok(price)) => Ok(price),
            Some(Err(message)) => Err(FeedError::Http(message)),
            None => Err(FeedError::MissingField("solana.usd")),
        }
    }

    fn reset_session(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_token_market_picks_deepest_solana_pair() {
        let json = json!({
            "schemaVersion": "1.0.0",
            "pairs": [
                {"chainId": "solana", "priceUsd": "0.010", "marketCap": 1000000,
                 "liquidity": {"usd": 5000}, "baseToken": {"symbol": "SHALLOW"}},
                {"chainId": "ethereum", "priceUsd": "9.0", "marketCap": 1,
                 "liquidity": {"usd": 9999999}, "baseToken": {"symbol": "WRONGCHAIN"}},
                {"chainId": "solana", "priceUsd": "0.012", "fdv": 1200000,
                 "liquidity": {"usd": 80000}, "baseToken": {"symbol": "TROUT"}}
            ]
        });

        let market = parse_token_market(&json, "Mint").unwrap();
        assert_eq!(
            market,
            TokenMarket {
                price_usd: 0.012,
                market_cap: 1_200_000.0,
                symbol: "TROUT".to_string(),
                liquidity_usd: 80_000.0,
            }
        );
    }

    #[test]
    fn test_parse_token_market_without_solana_pairs() {
        let json = json!({"pairs": [{"chainId": "bsc", "priceUsd": "1"}]});
        assert!(matches!(
            parse_token_market(&json, "Mint"),
            Err(FeedError::NoMarket(_))
        ));

        let json = json!({"schemaVersion": "1.0.0", "pairs": null});
        assert!(matches!(
            parse_token_market(&json, "Mint"),
            Err(FeedError::MissingField("pairs"))
        ));
    }

    #[test]
    fn test_parse_token_market_missing_price() {
        let json = json!({"pairs": [{"chainId": "solana", "baseToken": {"symbol": "X"}}]});
        assert!(matches!(
            parse_token_market(&json, "Mint"),
            Err(FeedError::MissingField("priceUsd"))
        ));
    }

    #[test]
    fn test_parse_sol_price() {
        assert_eq!(parse_sol_price(&json!({"solana": {"usd": 142.5}})).unwrap(), 142.5);
        assert!(parse_sol_price(&json!({"solana": {}})).is_err());
        assert!(parse_sol_price(&json!({"solana": {"usd": 0}})).is_err());
    }

    #[test]
    fn test_decode_json() {
        assert_eq!(
            decode_json(200, r#"{"solana":{"usd":99.5}}"#).unwrap(),
            json!({"solana": {"usd": 99.5}})
        );
        assert!(matches!(
            decode_json(503, "unavailable"),
            Err(FeedError::Status { status: 503, .. })
        ));
        assert!(matches!(
            decode_json(200, "<html>"),
            Err(FeedError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_market_data() {
        let mock = MockMarketData::new();
        mock.push_sol_price(100.0);
        mock.push_sol_error("timeout");

        assert_eq!(mock.fetch_sol_price().await.unwrap(), 100.0);
        assert!(mock.fetch_sol_price().await.is_err());
        assert!(mock.fetch_token_market("Mint").await.is_err());
    }
}
