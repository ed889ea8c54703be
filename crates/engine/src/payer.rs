//! Heuristics estimating how much SOL a buyer spent.
//!
//! Strategies run in order and the first positive estimate wins. A strategy may
//! also veto the candidate outright (its own balance went up), which stops the
//! cascade for that candidate.

use buybot_core::TransactionRecord;
use std::fmt;

/// Suffix shared by the system program and other all-ones program addresses.
const PROGRAM_ADDRESS_SUFFIX: &str = "11111111111111111111111111111111";

/// Whether an address looks like a program account rather than a wallet.
pub fn is_program_address(address: &str) -> bool {
    address.ends_with(PROGRAM_ADDRESS_SUFFIX)
}

/// Result of one payer strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayerEstimate {
    /// Lamports attributed to the purchase.
    Spent(u64),
    /// The candidate demonstrably did not pay.
    NotPayer,
    /// This strategy has no opinion.
    Unknown,
}

/// One named "who paid, and how much" heuristic.
pub trait PayerStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn estimate(&self, tx: &TransactionRecord, candidate: &str) -> PayerEstimate;
}

/// The candidate's own balance change.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactBalance;

impl PayerStrategy for ExactBalance {
    fn name(&self) -> &'static str {
        "exact_balance"
    }

    fn estimate(&self, tx: &TransactionRecord, candidate: &str) -> PayerEstimate {
        match tx.balance_change(candidate) {
            Some(delta) if delta < 0 => PayerEstimate::Spent(delta.unsigned_abs()),
            Some(_) => PayerEstimate::NotPayer,
            None => PayerEstimate::Unknown,
        }
    }
}

/// Largest SOL outflow of any wallet in the transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestOutflow;

impl PayerStrategy for LargestOutflow {
    fn name(&self) -> &'static str {
        "largest_outflow"
    }

    fn estimate(&self, tx: &TransactionRecord, _candidate: &str) -> PayerEstimate {
        tx.account_data
            .iter()
            .filter(|a| a.native_balance_change < 0 && !is_program_address(&a.account))
            .map(|a| a.native_balance_change)
            .min()
            .map(|delta| PayerEstimate::Spent(delta.unsigned_abs()))
            .unwrap_or(PayerEstimate::Unknown)
    }
}

/// Sum of all positive native transfers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTransfers;

impl PayerStrategy for NativeTransfers {
    fn name(&self) -> &'static str {
        "native_transfers"
    }

    fn estimate(&self, tx: &TransactionRecord, _candidate: &str) -> PayerEstimate {
        let total = tx
            .native_transfers
            .iter()
            .filter(|t| t.amount > 0)
            .try_fold(0u64, |acc, t| acc.checked_add(t.amount.unsigned_abs()));

        match total {
            Some(total) if total > 0 => PayerEstimate::Spent(total),
            _ => PayerEstimate::Unknown,
        }
    }
}

/// Exact balance, then largest outflow, then native transfers.
pub fn default_strategies() -> Vec<Box<dyn PayerStrategy>> {
    vec![
        Box::new(ExactBalance),
        Box::new(LargestOutflow),
        Box::new(NativeTransfers),
    ]
}

/// Outcome of running a strategy chain for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    Spent { lamports: u64, strategy: &'static str },
    NotPayer,
    Unknown,
}

/// Run strategies in order for a candidate; first positive estimate wins.
pub fn run_chain(
    strategies: &[Box<dyn PayerStrategy>],
    tx: &TransactionRecord,
    candidate: &str,
) -> ChainOutcome {
    for strategy in strategies {
        match strategy.estimate(tx, candidate) {
            PayerEstimate::Spent(lamports) if lamports > 0 => {
                return ChainOutcome::Spent {
                    lamports,
                    strategy: strategy.name(),
                }
            }
            PayerEstimate::NotPayer => return ChainOutcome::NotPayer,
            _ => {}
        }
    }
    ChainOutcome::Unknown
}
