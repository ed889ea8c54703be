//! Buy classification results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SOL amounts at or below this are treated as noise.
pub const DUST_THRESHOLD_SOL: f64 = 0.001;

/// A detected purchase of the tracked token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyEvent {
    /// Transaction signature.
    pub signature: String,
    /// Address that received the tokens and paid for them.
    pub buyer: String,
    /// SOL spent.
    pub sol: f64,
    /// USD value of the SOL spent.
    pub usd: f64,
    /// Estimated tokens bought at the current token price (0 if price unknown).
    pub tokens: f64,
    /// Block time in unix seconds.
    pub timestamp: i64,
    /// Name of the payer strategy that produced the SOL estimate.
    pub payer_strategy: &'static str,
}

impl BuyEvent {
    /// Whether the buy is large enough to alert on.
    #[inline]
    pub fn meets_minimum(&self, min_usd: f64) -> bool {
        self.usd >= min_usd
    }
}

/// Why a transaction was not classified as a buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No token transfer of the tracked mint.
    NoTrackedTransfer,
    /// Pool operation (add/remove liquidity, pool creation).
    LiquidityOperation,
    /// No transfer has a distinct receiving address.
    NoBuyer,
    /// The receiving address gained SOL, so it did not pay for the tokens.
    BuyerNotPayer,
    /// No SOL outflow above the dust threshold could be attributed.
    NoSolSpent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NoTrackedTransfer => "no tracked transfer",
            SkipReason::LiquidityOperation => "liquidity operation",
            SkipReason::NoBuyer => "no buyer",
            SkipReason::BuyerNotPayer => "buyer not payer",
            SkipReason::NoSolSpent => "no sol spent",
        };
        f.write_str(s)
    }
}

/// Outcome of classifying one transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Buy(BuyEvent),
    NotBuy(SkipReason),
}

impl Classification {
    #[inline]
    pub fn is_buy(&self) -> bool {
        matches!(self, Classification::Buy(_))
    }

    pub fn buy(&self) -> Option<&BuyEvent> {
        match self {
            Classification::Buy(event) => Some(event),
            Classification::NotBuy(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Classification::Buy(_) => None,
            Classification::NotBuy(reason) => Some(*reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(usd: f64) -> BuyEvent {
        BuyEvent {
            signature: "sig".to_string(),
            buyer: "buyer".to_string(),
            sol: 1.0,
            usd,
            tokens: 0.0,
            timestamp: 0,
            payer_strategy: "exact_balance",
        }
    }

    #[test]
    fn test_meets_minimum() {
        assert!(event(20.0).meets_minimum(20.0));
        assert!(event(200.0).meets_minimum(20.0));
        assert!(!event(5.0).meets_minimum(20.0));
    }

    #[test]
    fn test_classification_accessors() {
        let buy = Classification::Buy(event(10.0));
        assert!(buy.is_buy());
        assert_eq!(buy.buy().map(|e| e.usd), Some(10.0));
        assert_eq!(buy.skip_reason(), None);

        let skip = Classification::NotBuy(SkipReason::LiquidityOperation);
        assert!(!skip.is_buy());
        assert!(skip.buy().is_none());
        assert_eq!(skip.skip_reason(), Some(SkipReason::LiquidityOperation));
        assert_eq!(SkipReason::LiquidityOperation.to_string(), "liquidity operation");
    }
}
