//! REST feeds for the buy bot.
//!
//! ## Architecture
//!
//! - `helius` - Enhanced-transaction listing for the tracked mint
//! - `market` - Token market data (DexScreener) and SOL/USD (CoinGecko)
//! - `error` - Shared `FeedError`

pub mod error;
pub mod helius;
pub mod market;

pub use error::*;
pub use helius::*;
pub use market::*;
