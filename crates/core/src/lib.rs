//! Core data types for the token buy alert bot.

pub mod buy;
pub mod price;
pub mod transaction;

pub use buy::*;
pub use price::*;
pub use transaction::*;
