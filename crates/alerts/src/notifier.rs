//! Alert dispatch: photo with caption when an image is configured, text otherwise.

use crate::message::{format_buy_alert, format_startup_message, DEFAULT_EMOJI};
use crate::telegram::{AlertSink, TelegramError};
use async_trait::async_trait;
use buybot_core::{BuyEvent, PriceSnapshot};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),
    #[error("photo failed ({photo}), text fallback failed ({text})")]
    Fallback {
        photo: TelegramError,
        text: TelegramError,
    },
}

impl NotifierError {
    pub fn is_rate_limited(&self) -> bool {
        match self {
            NotifierError::Telegram(e) => e.is_rate_limited(),
            NotifierError::Fallback { text, .. } => text.is_rate_limited(),
        }
    }
}

/// How an alert reached the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Photo,
    Text,
}

/// Configuration for the notifier.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Image attached to alerts, if the file exists.
    pub image_path: Option<PathBuf>,
    /// Emoji repeated in the volume indicator.
    pub emoji: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            emoji: DEFAULT_EMOJI.to_string(),
        }
    }
}

/// Formats buy events and delivers them through an [`AlertSink`].
pub struct Notifier {
    sink: Box<dyn AlertSink>,
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(sink: Box<dyn AlertSink>, config: NotifierConfig) -> Self {
        Self { sink, config }
    }

    async fn image(&self) -> Option<&Path> {
        let path = self.config.image_path.as_deref()?;
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => {
                debug!(path = %path.display(), "Alert image not found, sending text");
                None
            }
        }
    }

    /// Send a buy alert.
    pub async fn send(&self, event: &BuyEvent, prices: &PriceSnapshot) -> Result<Delivery, NotifierError> {
        let text = format_buy_alert(event, prices, &self.config.emoji);

        if let Some(path) = self.image().await {
            match self.sink.send_photo(path, &text).await {
                Ok(()) => return Ok(Delivery::Photo),
                Err(photo) => {
                    warn!(signature = %event.signature, "Photo alert failed, falling back to text: {}", photo);
                    return match self.sink.send_text(&text).await {
                        Ok(()) => Ok(Delivery::Text),
                        Err(text) => Err(NotifierError::Fallback { photo, text }),
                    };
                }
            }
        }

        self.sink.send_text(&text).await?;
        Ok(Delivery::Text)
    }

    /// Send the "bot online" announcement.
    pub async fn announce(&self, prices: &PriceSnapshot, min_usd: f64) -> Result<(), NotifierError> {
        self.sink
            .send_text(&format_startup_message(prices, min_usd))
            .await?;
        Ok(())
    }
}

/// Sink that writes alerts to the log instead of Telegram.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn send_text(&self, text: &str) -> Result<(), TelegramError> {
        info!("📝 [dry-run] alert:\n{}", text);
        Ok(())
    }

    async fn send_photo(&self, path: &Path, caption: &str) -> Result<(), TelegramError> {
        info!("📝 [dry-run] photo {} with caption:\n{}", path.display(), caption);
        Ok(())
    }
}

/// A message captured by [`MockAlertSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Text(String),
    Photo { path: PathBuf, caption: String },
}

/// Recording sink for tests. Clones share state.
#[derive(Clone, Default)]
pub struct MockAlertSink {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail_photo: Arc<AtomicBool>,
    fail_text: Arc<AtomicBool>,
    rate_limited: Arc<AtomicBool>,
}

impl MockAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_photos(&self, fail: bool) {
        self.fail_photo.store(fail, Ordering::SeqCst);
    }

    pub fn fail_texts(&self, fail: bool) {
        self.fail_text.store(fail, Ordering::SeqCst);
    }

    /// Answer every send with Telegram's "retry after" error.
    pub fn rate_limit(&self, limited: bool) {
        self.rate_limited.store(limited, Ordering::SeqCst);
    }

    /// Messages delivered so far, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn rejected() -> TelegramError {
        TelegramError::Api(teloxide::RequestError::Api(teloxide::ApiError::Unknown(
            "mock rejection".to_string(),
        )))
    }

    fn check(&self, fail: &AtomicBool) -> Result<(), TelegramError> {
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(TelegramError::Api(teloxide::RequestError::RetryAfter(
                teloxide::types::Seconds::from_seconds(5),
            )));
        }
        if fail.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        Ok(())
    }

    fn push(&self, message: SentMessage) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
    }
}

#[async_trait]
impl AlertSink for MockAlertSink {
    async fn send_text(&self, text: &str) -> Result<(), TelegramError> {
        self.check(&self.fail_text)?;
        self.push(SentMessage::Text(text.to_string()));
        Ok(())
    }

    async fn send_photo(&self, path: &Path, caption: &str) -> Result<(), TelegramError> {
        self.check(&self.fail_photo)?;
        self.push(SentMessage::Photo {
            path: path.to_path_buf(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}
