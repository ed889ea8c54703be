//! Telegram transport.

use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{InputFile, LinkPreviewOptions, ParseMode, Recipient};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

impl TelegramError {
    /// Telegram asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TelegramError::Api(teloxide::RequestError::RetryAfter(_)))
    }
}

/// Destination for alert messages.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Send an HTML message without link previews.
    async fn send_text(&self, text: &str) -> Result<(), TelegramError>;

    /// Send a photo with an HTML caption.
    async fn send_photo(&self, path: &Path, caption: &str) -> Result<(), TelegramError>;
}

/// Numeric chat ids go to `ChatId`, anything else is a channel username.
pub fn parse_recipient(chat_id: &str) -> Recipient {
    let chat_id = chat_id.trim();
    match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if chat_id.starts_with('@') => Recipient::ChannelUsername(chat_id.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{}", chat_id)),
    }
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Telegram bot bound to one chat.
pub struct TelegramBot {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramBot {
    /// Create a new bot with the given token and chat.
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self {
            bot: Bot::new(token),
            recipient: parse_recipient(chat_id),
        }
    }
}

#[async_trait]
impl AlertSink for TelegramBot {
    async fn send_text(&self, text: &str) -> Result<(), TelegramError> {
        self.bot
            .send_message(self.recipient.clone(), text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_preview())
            .await?;
        Ok(())
    }

    async fn send_photo(&self, path: &Path, caption: &str) -> Result<(), TelegramError> {
        self.bot
            .send_photo(self.recipient.clone(), InputFile::file(path.to_path_buf()))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use teloxide::types::Seconds;
    use teloxide::{ApiError, RequestError};

    #[test]
    fn test_parse_recipient() {
        assert_eq!(parse_recipient("-1001234567890"), Recipient::Id(ChatId(-1001234567890)));
        assert_eq!(parse_recipient(" 42 "), Recipient::Id(ChatId(42)));
        assert_eq!(
            parse_recipient("@trout_buys"),
            Recipient::ChannelUsername("@trout_buys".to_string())
        );
        assert_eq!(
            parse_recipient("trout_buys"),
            Recipient::ChannelUsername("@trout_buys".to_string())
        );
    }

    #[test]
    fn test_rate_limited() {
        let err = TelegramError::from(RequestError::RetryAfter(Seconds::from_seconds(3)));
        assert!(err.is_rate_limited());

        let err = TelegramError::from(RequestError::Api(ApiError::ChatNotFound));
        assert!(!err.is_rate_limited());
    }
}
