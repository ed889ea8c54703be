//! Buy detection for transactions of the tracked mint.
//!
//! Policy: the buyer is the receiving address of a tracked-mint transfer, and
//! pool operations are excluded by keyword. The SOL spent is estimated by the
//! payer strategy chain in [`crate::payer`].

use crate::payer::{default_strategies, run_chain, ChainOutcome, PayerStrategy};
use buybot_core::{
    BuyEvent, Classification, PriceSnapshot, SkipReason, TokenTransfer, TransactionRecord,
    DUST_THRESHOLD_SOL, LAMPORTS_PER_SOL,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Substrings of `type`/`description` that mark pool operations.
pub const LIQUIDITY_KEYWORDS: [&str; 6] = [
    "liquidity",
    "create_pool",
    "add_lp",
    "remove_lp",
    "withdraw_lp",
    "deposit_lp",
];

/// Configuration for the buy classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Tracked token mint.
    pub mint: String,
    /// SOL amounts at or below this are not buys.
    pub dust_threshold_sol: f64,
}

impl ClassifierConfig {
    pub fn new(mint: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            dust_threshold_sol: DUST_THRESHOLD_SOL,
        }
    }
}

/// Whether the transaction's type or description names a liquidity operation.
pub fn is_liquidity_operation(tx: &TransactionRecord) -> bool {
    [tx.tx_type.as_deref(), tx.description.as_deref()]
        .into_iter()
        .flatten()
        .map(str::to_ascii_lowercase)
        .any(|text| LIQUIDITY_KEYWORDS.iter().any(|k| text.contains(k)))
}

/// Receiving addresses of real transfers, deduplicated, in transfer order.
fn candidate_buyers<'a>(transfers: &[&'a TokenTransfer]) -> Vec<&'a str> {
    let mut candidates: Vec<&str> = Vec::new();
    for &transfer in transfers {
        if transfer.token_amount <= 0.0 || transfer.to.is_empty() || transfer.to == transfer.from {
            continue;
        }
        if !candidates.contains(&transfer.to.as_str()) {
            candidates.push(transfer.to.as_str());
        }
    }
    candidates
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Classifies transactions as buys of the tracked token.
#[derive(Debug)]
pub struct BuyClassifier {
    config: ClassifierConfig,
    strategies: Vec<Box<dyn PayerStrategy>>,
}

impl BuyClassifier {
    /// Create a classifier with the default payer strategy chain.
    pub fn new(config: ClassifierConfig) -> Self {
        Self::with_strategies(config, default_strategies())
    }

    pub fn with_strategies(config: ClassifierConfig, strategies: Vec<Box<dyn PayerStrategy>>) -> Self {
        Self { config, strategies }
    }

    /// Names of the payer strategies, in evaluation order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Classify one transaction against the current prices.
    ///
    /// The USD minimum is not applied here; see [`BuyEvent::meets_minimum`].
    pub fn classify(&self, tx: &TransactionRecord, prices: &PriceSnapshot) -> Classification {
        let transfers: Vec<&TokenTransfer> = tx.transfers_of(&self.config.mint).collect();
        if transfers.is_empty() {
            return Classification::NotBuy(SkipReason::NoTrackedTransfer);
        }

        if is_liquidity_operation(tx) {
            return Classification::NotBuy(SkipReason::LiquidityOperation);
        }

        let candidates = candidate_buyers(&transfers);
        if candidates.is_empty() {
            return Classification::NotBuy(SkipReason::NoBuyer);
        }

        let mut vetoed = 0usize;
        for candidate in &candidates {
            match run_chain(&self.strategies, tx, candidate) {
                ChainOutcome::Spent { lamports, strategy } => {
                    let sol = lamports as f64 / LAMPORTS_PER_SOL;
                    if sol <= self.config.dust_threshold_sol {
                        trace!(signature = %tx.signature, candidate, sol, "Spend below dust threshold");
                        continue;
                    }

                    let usd = prices.sol_to_usd(sol);
                    return Classification::Buy(BuyEvent {
                        signature: tx.signature.clone(),
                        buyer: candidate.to_string(),
                        sol,
                        usd,
                        tokens: prices.usd_to_tokens(usd),
                        timestamp: tx.timestamp.unwrap_or_else(unix_now),
                        payer_strategy: strategy,
                    });
                }
                ChainOutcome::NotPayer => vetoed += 1,
                ChainOutcome::Unknown => {}
            }
        }

        if vetoed == candidates.len() {
            Classification::NotBuy(SkipReason::BuyerNotPayer)
        } else {
            Classification::NotBuy(SkipReason::NoSolSpent)
        }
    }
}
