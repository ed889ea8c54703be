//! Cached token and SOL prices.

use buybot_core::PriceSnapshot;
use buybot_feeds::{FeedError, MarketDataSource};
use tracing::debug;

/// Result of one price refresh. Each half fails independently.
#[derive(Debug, Default)]
pub struct RefreshOutcome {
    pub market_error: Option<FeedError>,
    pub sol_error: Option<FeedError>,
}

impl RefreshOutcome {
    pub fn market_updated(&self) -> bool {
        self.market_error.is_none()
    }

    pub fn sol_updated(&self) -> bool {
        self.sol_error.is_none()
    }

    /// Both halves updated.
    pub fn is_complete(&self) -> bool {
        self.market_updated() && self.sol_updated()
    }
}

/// Latest known prices for the tracked mint.
///
/// Failed refreshes keep previous values; before the first successful refresh
/// the snapshot holds the configured defaults.
#[derive(Debug, Clone)]
pub struct PriceCache {
    mint: String,
    snapshot: PriceSnapshot,
}

impl PriceCache {
    pub fn new(mint: impl Into<String>, defaults: PriceSnapshot) -> Self {
        Self {
            mint: mint.into(),
            snapshot: defaults,
        }
    }

    pub fn snapshot(&self) -> &PriceSnapshot {
        &self.snapshot
    }

    /// Fetch token market data and SOL price concurrently and apply what succeeded.
    pub async fn refresh(&mut self, source: &dyn MarketDataSource) -> RefreshOutcome {
        let (market, sol) = tokio::join!(
            source.fetch_token_market(&self.mint),
            source.fetch_sol_price()
        );

        let mut outcome = RefreshOutcome::default();

        match market {
            Ok(market) => {
                debug!(
                    symbol = %market.symbol,
                    price = market.price_usd,
                    market_cap = market.market_cap,
                    "Token market updated"
                );
                self.snapshot.token_price = market.price_usd;
                self.snapshot.market_cap = market.market_cap;
                if !market.symbol.is_empty() {
                    self.snapshot.symbol = market.symbol;
                }
                self.snapshot.market_loaded = true;
            }
            Err(e) => outcome.market_error = Some(e),
        }

        match sol {
            Ok(price) => {
                debug!(sol_price = price, "SOL price updated");
                self.snapshot.sol_price = price;
                self.snapshot.sol_loaded = true;
            }
            Err(e) => outcome.sol_error = Some(e),
        }

        outcome
    }
}
