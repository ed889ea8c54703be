//! Run statistics.

use buybot_alerts::Delivery;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Statistics for the bot.
#[derive(Debug)]
pub struct BotStats {
    /// Poll cycles run.
    pub cycles: AtomicU64,
    /// Cycles whose fetch failed.
    pub failed_cycles: AtomicU64,
    /// New transactions classified.
    pub transactions_inspected: AtomicU64,
    /// Buys detected (any size).
    pub buys_detected: AtomicU64,
    /// Buys under the USD minimum.
    pub buys_below_minimum: AtomicU64,
    pub alerts_photo: AtomicU64,
    pub alerts_text: AtomicU64,
    pub alerts_failed: AtomicU64,
    /// HTTP session resets after repeated failures.
    pub session_resets: AtomicU64,
    started_at: Instant,
}

impl Default for BotStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BotStats {
    pub fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            failed_cycles: AtomicU64::new(0),
            transactions_inspected: AtomicU64::new(0),
            buys_detected: AtomicU64::new(0),
            buys_below_minimum: AtomicU64::new(0),
            alerts_photo: AtomicU64::new(0),
            alerts_text: AtomicU64::new(0),
            alerts_failed: AtomicU64::new(0),
            session_resets: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_cycle(&self) {
        self.failed_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transaction(&self) {
        self.transactions_inspected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_buy(&self, meets_minimum: bool) {
        self.buys_detected.fetch_add(1, Ordering::Relaxed);
        if !meets_minimum {
            self.buys_below_minimum.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_alert(&self, delivery: Delivery) {
        match delivery {
            Delivery::Photo => self.alerts_photo.fetch_add(1, Ordering::Relaxed),
            Delivery::Text => self.alerts_text.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_alert_failure(&self) {
        self.alerts_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_reset(&self) {
        self.session_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn summary(&self) -> StatsSummary {
        let alerts_photo = self.alerts_photo.load(Ordering::Relaxed);
        let alerts_text = self.alerts_text.load(Ordering::Relaxed);
        StatsSummary {
            cycles: self.cycles.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
            transactions_inspected: self.transactions_inspected.load(Ordering::Relaxed),
            buys_detected: self.buys_detected.load(Ordering::Relaxed),
            buys_below_minimum: self.buys_below_minimum.load(Ordering::Relaxed),
            alerts_sent: alerts_photo + alerts_text,
            alerts_photo,
            alerts_failed: self.alerts_failed.load(Ordering::Relaxed),
            session_resets: self.session_resets.load(Ordering::Relaxed),
            uptime_secs: self.uptime_secs(),
        }
    }
}

/// Summary of statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub transactions_inspected: u64,
    pub buys_detected: u64,
    pub buys_below_minimum: u64,
    pub alerts_sent: u64,
    pub alerts_photo: u64,
    pub alerts_failed: u64,
    pub session_resets: u64,
    pub uptime_secs: u64,
}
