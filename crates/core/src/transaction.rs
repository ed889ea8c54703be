//! Enhanced transaction records as returned by the transaction-listing API.
//!
//! Every field except the signature is lenient: missing collections default to
//! empty and numeric fields accept either JSON numbers or numeric strings, so an
//! unexpected payload shape degrades to "no signal" instead of a parse failure.

use serde::{Deserialize, Deserializer, Serialize};

/// Lamports per whole SOL.
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Convert a lamport amount to SOL.
#[inline]
pub fn lamports_to_sol(lamports: i64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL
}

/// A single transaction involving the tracked token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction signature (unique id).
    pub signature: String,
    /// Block time in unix seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Parsed transaction type (e.g. "SWAP", "ADD_LIQUIDITY").
    #[serde(default, rename = "type")]
    pub tx_type: Option<String>,
    /// Human readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// SPL token transfers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub token_transfers: Vec<TokenTransfer>,
    /// Native SOL transfers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub native_transfers: Vec<NativeTransfer>,
    /// Per-account native balance deltas.
    #[serde(default, deserialize_with = "null_as_default")]
    pub account_data: Vec<AccountData>,
}

impl TransactionRecord {
    /// Create a bare record with the given signature.
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            timestamp: None,
            tx_type: None,
            description: None,
            token_transfers: Vec::new(),
            native_transfers: Vec::new(),
            account_data: Vec::new(),
        }
    }

    /// Token transfers of a specific mint.
    pub fn transfers_of<'a>(&'a self, mint: &'a str) -> impl Iterator<Item = &'a TokenTransfer> + 'a {
        self.token_transfers.iter().filter(move |t| t.mint == mint)
    }

    /// Native balance change of an account, if the account appears in the record.
    pub fn balance_change(&self, account: &str) -> Option<i64> {
        self.account_data
            .iter()
            .find(|a| a.account == account)
            .map(|a| a.native_balance_change)
    }
}

/// An SPL token transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    /// Token mint.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mint: String,
    /// Owner of the sending token account.
    #[serde(default, rename = "fromUserAccount", deserialize_with = "null_as_default")]
    pub from: String,
    /// Owner of the receiving token account.
    #[serde(default, rename = "toUserAccount", deserialize_with = "null_as_default")]
    pub to: String,
    /// UI token amount (decimals applied).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub token_amount: f64,
}

impl TokenTransfer {
    pub fn new(mint: impl Into<String>, from: impl Into<String>, to: impl Into<String>, amount: f64) -> Self {
        Self {
            mint: mint.into(),
            from: from.into(),
            to: to.into(),
            token_amount: amount,
        }
    }
}

/// A native SOL transfer, amount in lamports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTransfer {
    #[serde(default, rename = "fromUserAccount", deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(default, rename = "toUserAccount", deserialize_with = "null_as_default")]
    pub to: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub amount: i64,
}

/// Native balance delta of one account, in lamports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub account: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub native_balance_change: i64,
}

impl AccountData {
    pub fn new(account: impl Into<String>, native_balance_change: i64) -> Self {
        Self {
            account: account.into(),
            native_balance_change,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a JSON value that may be a number or a numeric string.
pub fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).unwrap_or(0.0))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or(0))
}
