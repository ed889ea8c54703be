//! Telegram alerts for detected buys.
//!
//! This crate provides:
//! - HTML alert formatting (volume emojis, whale tiers, compact numbers)
//! - Telegram bot transport behind the `AlertSink` trait
//! - The `Notifier` with photo-then-text fallback

pub mod message;
pub mod notifier;
pub mod telegram;

pub use message::*;
pub use notifier::{Delivery, LogSink, MockAlertSink, Notifier, NotifierConfig, NotifierError, SentMessage};
pub use telegram::{parse_recipient, AlertSink, TelegramBot, TelegramError};
