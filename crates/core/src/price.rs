//! Market price snapshot shared by the classifier and the alert formatter.

use serde::{Deserialize, Serialize};

/// Latest known prices for the tracked token and SOL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Token price in USD (0 when unknown).
    pub token_price: f64,
    /// Token market cap in USD (0 when unknown).
    pub market_cap: f64,
    /// Token ticker symbol.
    pub symbol: String,
    /// SOL price in USD.
    pub sol_price: f64,
    /// Whether token market data has been loaded from the API at least once.
    pub market_loaded: bool,
    /// Whether the SOL price has been loaded from the API at least once.
    pub sol_loaded: bool,
}

impl PriceSnapshot {
    /// Snapshot holding only fallback defaults, used before the first refresh.
    pub fn with_defaults(symbol: impl Into<String>, sol_price: f64) -> Self {
        Self {
            token_price: 0.0,
            market_cap: 0.0,
            symbol: symbol.into(),
            sol_price,
            market_loaded: false,
            sol_loaded: false,
        }
    }

    /// USD value of an amount of SOL.
    #[inline]
    pub fn sol_to_usd(&self, sol: f64) -> f64 {
        sol * self.sol_price
    }

    /// Estimated token amount bought for a USD value.
    /// Returns zero when the token price is unknown.
    pub fn usd_to_tokens(&self, usd: f64) -> f64 {
        if self.token_price > 0.0 {
            usd / self.token_price
        } else {
            0.0
        }
    }
}

impl Default for PriceSnapshot {
    fn default() -> Self {
        Self::with_defaults("TOKEN", 0.0)
    }
}

/// Token market data from a market-data endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMarket {
    pub price_usd: f64,
    pub market_cap: f64,
    pub symbol: String,
    pub liquidity_usd: f64,
}
