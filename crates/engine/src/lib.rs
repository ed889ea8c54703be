//! Buy detection engine.
//!
//! This crate holds the per-transaction logic of the bot: buy classification,
//! payer estimation, signature deduplication and the price cache.

pub mod classifier;
pub mod dedup;
pub mod payer;
pub mod price_cache;

pub use classifier::*;
pub use dedup::*;
pub use payer::*;
pub use price_cache::*;
