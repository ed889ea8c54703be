//! Poll loop: fetch, classify, dedup and alert.

use crate::config::AppConfig;
use crate::stats::BotStats;
use buybot_alerts::Notifier;
use buybot_core::{Classification, PriceSnapshot};
use buybot_engine::{BuyClassifier, ClassifierConfig, PriceCache, SignatureCache};
use buybot_feeds::{FeedError, MarketDataSource, TransactionSource};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("transaction fetch failed: {0}")]
    Fetch(#[from] FeedError),
}

impl MonitorError {
    pub fn is_transient(&self) -> bool {
        match self {
            MonitorError::Fetch(e) => e.is_transient(),
        }
    }

    /// Pause before the next cycle. A rate-limited feed extends the configured backoff.
    pub fn backoff(&self, configured: Duration) -> Duration {
        match self {
            MonitorError::Fetch(e) if e.is_rate_limited() => e
                .suggested_retry_delay()
                .map_or(configured, |hint| hint.max(configured)),
            MonitorError::Fetch(_) => configured,
        }
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    Processing,
    Sleeping,
    ErrorBackoff,
}

/// Loop settings.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub mint: String,
    pub min_usd: f64,
    pub poll_interval: Duration,
    pub alert_delay: Duration,
    pub error_backoff: Duration,
    pub max_consecutive_errors: u32,
    pub price_refresh_cycles: u64,
    pub stats_interval_cycles: u64,
    pub seen_capacity: usize,
    pub token_symbol: String,
    pub default_sol_price: f64,
}

impl From<&AppConfig> for MonitorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            mint: config.mint.clone(),
            min_usd: config.min_usd,
            poll_interval: config.poll_interval,
            alert_delay: config.alert_delay,
            error_backoff: config.error_backoff,
            max_consecutive_errors: config.max_consecutive_errors,
            price_refresh_cycles: config.price_refresh_cycles.max(1),
            stats_interval_cycles: config.stats_interval_cycles.max(1),
            seen_capacity: config.seen_capacity,
            token_symbol: config.token_symbol.clone(),
            default_sol_price: config.default_sol_price,
        }
    }
}

/// What one successful cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub new_transactions: usize,
    pub buys: usize,
    pub alerts_sent: usize,
}

/// The poll loop and everything it owns.
pub struct Monitor {
    settings: MonitorSettings,
    source: Box<dyn TransactionSource>,
    market: Box<dyn MarketDataSource>,
    notifier: Notifier,
    classifier: BuyClassifier,
    prices: PriceCache,
    seen: SignatureCache,
    stats: BotStats,
    state: PollState,
    cycle: u64,
    last_refresh: Option<u64>,
    consecutive_errors: u32,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        source: Box<dyn TransactionSource>,
        market: Box<dyn MarketDataSource>,
        notifier: Notifier,
    ) -> Self {
        let classifier = BuyClassifier::new(ClassifierConfig::new(&settings.mint));
        let prices = PriceCache::new(
            &settings.mint,
            PriceSnapshot::with_defaults(&settings.token_symbol, settings.default_sol_price),
        );
        let seen = SignatureCache::new(settings.seen_capacity);

        Self {
            settings,
            source,
            market,
            notifier,
            classifier,
            prices,
            seen,
            stats: BotStats::new(),
            state: PollState::Idle,
            cycle: 0,
            last_refresh: None,
            consecutive_errors: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn stats(&self) -> &BotStats {
        &self.stats
    }

    pub fn prices(&self) -> &PriceSnapshot {
        self.prices.snapshot()
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    fn set_state(&mut self, state: PollState) {
        trace!(from = ?self.state, to = ?state, cycle = self.cycle, "Poll state");
        self.state = state;
    }

    /// Refresh prices, logging whichever half failed.
    pub async fn refresh_prices(&mut self) {
        let outcome = self.prices.refresh(self.market.as_ref()).await;
        self.last_refresh = Some(self.cycle);

        if let Some(e) = &outcome.market_error {
            warn!("Failed to refresh token market data, keeping previous values: {}", e);
        }
        if let Some(e) = &outcome.sol_error {
            warn!("Failed to refresh SOL price, keeping previous value: {}", e);
        }

        let snapshot = self.prices.snapshot();
        if outcome.is_complete() {
            info!(
                "💹 Prices | {} ${:.8} | MCap ${:.0} | SOL ${:.2}",
                snapshot.symbol, snapshot.token_price, snapshot.market_cap, snapshot.sol_price
            );
        }
    }

    /// Initial price load and optional "bot online" message.
    pub async fn start(&mut self, announce: bool) {
        self.refresh_prices().await;

        if !announce {
            return;
        }
        match self
            .notifier
            .announce(self.prices.snapshot(), self.settings.min_usd)
            .await
        {
            Ok(()) => info!("📣 Startup announcement sent"),
            Err(e) => warn!("Failed to send startup announcement: {}", e),
        }
    }

    fn refresh_due(&self) -> bool {
        self.cycle % self.settings.price_refresh_cycles.max(1) == 0
            && self.last_refresh != Some(self.cycle)
    }

    /// Run one cycle without the trailing sleep.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, MonitorError> {
        if self.refresh_due() {
            self.refresh_prices().await;
        }

        self.set_state(PollState::Fetching);
        let batch = self.source.fetch().await?;

        self.set_state(PollState::Processing);
        let mut report = CycleReport {
            fetched: batch.len(),
            ..Default::default()
        };

        for tx in &batch {
            if tx.signature.is_empty() || self.seen.seen(&tx.signature) {
                continue;
            }
            self.seen.record(tx.signature.as_str());
            report.new_transactions += 1;
            self.stats.record_transaction();

            let event = match self.classifier.classify(tx, self.prices.snapshot()) {
                Classification::Buy(event) => event,
                Classification::NotBuy(reason) => {
                    trace!(signature = %tx.signature, %reason, "Not a buy");
                    continue;
                }
            };

            report.buys += 1;
            let meets_minimum = event.meets_minimum(self.settings.min_usd);
            self.stats.record_buy(meets_minimum);

            if !meets_minimum {
                debug!(
                    signature = %event.signature,
                    usd = event.usd,
                    min_usd = self.settings.min_usd,
                    "Buy below minimum, not alerting"
                );
                continue;
            }

            info!(
                "🛒 Buy {:.3} SOL (${:.2}) by {} | {}",
                event.sol, event.usd, event.buyer, event.signature
            );

            match self.notifier.send(&event, self.prices.snapshot()).await {
                Ok(delivery) => {
                    report.alerts_sent += 1;
                    self.stats.record_alert(delivery);
                    debug!(signature = %event.signature, ?delivery, "Alert delivered");
                }
                Err(e) if e.is_rate_limited() => {
                    self.stats.record_alert_failure();
                    warn!(signature = %event.signature, "⏳ Telegram rate limit, alert dropped: {}", e);
                }
                Err(e) => {
                    self.stats.record_alert_failure();
                    error!(signature = %event.signature, "Failed to send alert: {}", e);
                }
            }

            if !self.settings.alert_delay.is_zero() {
                tokio::time::sleep(self.settings.alert_delay).await;
            }
        }

        Ok(report)
    }

    /// Count a failed cycle; rebuild HTTP sessions once the limit is exceeded.
    /// Returns true if sessions were reset.
    fn record_failure(&mut self) -> bool {
        self.consecutive_errors += 1;
        if self.consecutive_errors <= self.settings.max_consecutive_errors {
            return false;
        }

        warn!(
            "🔄 {} consecutive failed cycles, resetting HTTP sessions",
            self.consecutive_errors
        );
        self.source.reset_session();
        self.market.reset_session();
        self.consecutive_errors = 0;
        self.stats.record_session_reset();
        true
    }

    /// One full loop iteration: cycle, bookkeeping and sleep.
    pub async fn step(&mut self) {
        self.stats.record_cycle();

        match self.run_cycle().await {
            Ok(report) => {
                self.consecutive_errors = 0;
                if report.new_transactions > 0 {
                    debug!(
                        fetched = report.fetched,
                        new = report.new_transactions,
                        buys = report.buys,
                        alerts = report.alerts_sent,
                        "Cycle complete"
                    );
                }
                self.set_state(PollState::Sleeping);
                tokio::time::sleep(self.settings.poll_interval).await;
            }
            Err(e) => {
                self.stats.record_failed_cycle();
                let backoff = e.backoff(self.settings.error_backoff);
                if e.is_transient() {
                    warn!("Monitor error, retrying in {:?}: {}", backoff, e);
                } else {
                    error!("Monitor error: {}", e);
                }
                self.set_state(PollState::ErrorBackoff);
                tokio::time::sleep(backoff).await;
                self.record_failure();
            }
        }

        self.cycle += 1;
        if self.cycle % self.settings.stats_interval_cycles.max(1) == 0 {
            self.log_stats();
        }
        self.set_state(PollState::Idle);
    }

    /// Poll forever.
    pub async fn run(&mut self) {
        info!(
            "👀 Monitoring {} (min ${:.2}, every {:?})",
            self.settings.mint, self.settings.min_usd, self.settings.poll_interval
        );
        loop {
            self.step().await;
        }
    }

    pub fn log_stats(&self) {
        let s = self.stats.summary();
        info!(
            "📊 Stats | Uptime: {}s | Cycles: {} ({} failed) | Txs: {} | Buys: {} ({} below min) | Alerts: {} sent, {} failed | Resets: {} | Seen: {}",
            s.uptime_secs,
            s.cycles,
            s.failed_cycles,
            s.transactions_inspected,
            s.buys_detected,
            s.buys_below_minimum,
            s.alerts_sent,
            s.alerts_failed,
            s.session_resets,
            self.seen.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buybot_alerts::{MockAlertSink, NotifierConfig, SentMessage};
    use buybot_core::{AccountData, TokenMarket, TokenTransfer, TransactionRecord};
    use buybot_feeds::{MockMarketData, MockTransactionSource};
    use pretty_assertions::assert_eq;

    const MINT: &str = "TrackedMint";

    fn settings() -> MonitorSettings {
        MonitorSettings {
            mint: MINT.to_string(),
            min_usd: 20.0,
            poll_interval: Duration::ZERO,
            alert_delay: Duration::ZERO,
            error_backoff: Duration::ZERO,
            max_consecutive_errors: 5,
            price_refresh_cycles: 20,
            stats_interval_cycles: 100,
            seen_capacity: 1_000,
            token_symbol: "TOKEN".to_string(),
            default_sol_price: 150.0,
        }
    }

    fn buy_tx(signature: &str, lamports: i64) -> TransactionRecord {
        let mut tx = TransactionRecord::new(signature);
        tx.timestamp = Some(1_700_000_000);
        tx.tx_type = Some("SWAP".to_string());
        tx.token_transfers = vec![TokenTransfer::new(MINT, "Pool", "Addr1", 1000.0)];
        tx.account_data = vec![AccountData::new("Addr1", lamports)];
        tx
    }

    struct Harness {
        monitor: Monitor,
        source: MockTransactionSource,
        market: MockMarketData,
        sink: MockAlertSink,
    }

    fn harness() -> Harness {
        let source = MockTransactionSource::new();
        let market = MockMarketData::new();
        let sink = MockAlertSink::new();
        market.push_market(TokenMarket {
            price_usd: 0.01,
            market_cap: 1_000_000.0,
            symbol: "TROUT".to_string(),
            liquidity_usd: 50_000.0,
        });
        market.push_sol_price(100.0);

        let monitor = Monitor::new(
            settings(),
            Box::new(source.clone()),
            Box::new(market.clone()),
            Notifier::new(Box::new(sink.clone()), NotifierConfig::default()),
        );
        Harness {
            monitor,
            source,
            market,
            sink,
        }
    }

    #[tokio::test]
    async fn test_one_alert_across_identical_cycles() {
        let mut h = harness();
        h.source.set_default_batch(vec![buy_tx("sig-big", -2_000_000_000)]);

        let first = h.monitor.run_cycle().await.unwrap();
        let second = h.monitor.run_cycle().await.unwrap();

        assert_eq!(
            first,
            CycleReport {
                fetched: 1,
                new_transactions: 1,
                buys: 1,
                alerts_sent: 1
            }
        );
        assert_eq!(second.new_transactions, 0);
        assert_eq!(second.alerts_sent, 0);

        let sent = h.sink.sent();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            SentMessage::Text(text) => {
                assert!(text.contains("TROUT BUY"));
                assert!(text.contains("2.000 SOL ($200.00)"));
            }
            other => panic!("expected text alert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_below_minimum_is_not_dispatched() {
        let mut h = harness();
        h.source.push_batch(vec![buy_tx("sig-small", -50_000_000)]);

        let report = h.monitor.run_cycle().await.unwrap();

        assert_eq!(report.buys, 1);
        assert_eq!(report.alerts_sent, 0);
        assert!(h.sink.sent().is_empty());
        assert_eq!(h.monitor.stats().summary().buys_below_minimum, 1);
    }

    #[tokio::test]
    async fn test_signature_recorded_even_when_delivery_fails() {
        let mut h = harness();
        h.sink.fail_texts(true);
        h.source.set_default_batch(vec![buy_tx("sig", -2_000_000_000)]);

        h.monitor.run_cycle().await.unwrap();
        h.sink.fail_texts(false);
        let report = h.monitor.run_cycle().await.unwrap();

        assert_eq!(report.new_transactions, 0);
        assert!(h.sink.sent().is_empty());
        assert_eq!(h.monitor.stats().summary().alerts_failed, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_alert_is_counted_as_failed() {
        let mut h = harness();
        h.sink.rate_limit(true);
        h.source.push_batch(vec![buy_tx("sig", -2_000_000_000)]);

        let report = h.monitor.run_cycle().await.unwrap();

        assert_eq!(report.buys, 1);
        assert_eq!(report.alerts_sent, 0);
        assert_eq!(h.monitor.stats().summary().alerts_failed, 1);
    }

    #[tokio::test]
    async fn test_non_buys_are_recorded_but_not_alerted() {
        let mut h = harness();
        let mut liquidity = buy_tx("sig-lp", -2_000_000_000);
        liquidity.tx_type = Some("ADD_LIQUIDITY".to_string());
        let mut other_mint = buy_tx("sig-other", -2_000_000_000);
        other_mint.token_transfers[0].mint = "OtherMint".to_string();
        h.source.push_batch(vec![liquidity, other_mint]);

        let report = h.monitor.run_cycle().await.unwrap();

        assert_eq!(report.new_transactions, 2);
        assert_eq!(report.buys, 0);
        assert!(h.sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_price_refresh_keeps_defaults() {
        let source = MockTransactionSource::new();
        let market = MockMarketData::new();
        market.push_market_error("HTTP 500");
        market.push_sol_error("HTTP 500");
        let mut monitor = Monitor::new(
            settings(),
            Box::new(source),
            Box::new(market),
            Notifier::new(Box::new(MockAlertSink::new()), NotifierConfig::default()),
        );

        monitor.run_cycle().await.unwrap();

        assert_eq!(monitor.prices(), &PriceSnapshot::with_defaults("TOKEN", 150.0));
    }

    #[tokio::test]
    async fn test_prices_refreshed_on_schedule() {
        let mut h = harness();
        h.market.push_sol_price(200.0);

        h.monitor.step().await;
        assert_eq!(h.monitor.prices().sol_price, 100.0);

        for _ in 1..20 {
            h.monitor.step().await;
        }
        assert_eq!(h.monitor.prices().sol_price, 100.0);

        h.monitor.step().await;
        assert_eq!(h.monitor.prices().sol_price, 200.0);
        // Token market failed on the second refresh; previous values kept.
        assert_eq!(h.monitor.prices().token_price, 0.01);
    }

    #[tokio::test]
    async fn test_session_reset_after_repeated_errors() {
        let mut h = harness();
        for _ in 0..6 {
            h.source.push_error("connection reset");
        }

        for _ in 0..5 {
            h.monitor.step().await;
        }
        assert_eq!(h.monitor.consecutive_errors(), 5);
        assert_eq!(h.source.reset_count(), 0);

        h.monitor.step().await;
        assert_eq!(h.monitor.consecutive_errors(), 0);
        assert_eq!(h.source.reset_count(), 1);
        assert_eq!(h.market.reset_count(), 1);

        let summary = h.monitor.stats().summary();
        assert_eq!(summary.failed_cycles, 6);
        assert_eq!(summary.session_resets, 1);
        assert_eq!(h.monitor.state(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_success_clears_error_counter() {
        let mut h = harness();
        h.source.push_error("timeout");
        h.source.push_error("timeout");

        h.monitor.step().await;
        h.monitor.step().await;
        assert_eq!(h.monitor.consecutive_errors(), 2);

        h.monitor.step().await;
        assert_eq!(h.monitor.consecutive_errors(), 0);
        assert_eq!(h.source.fetch_count(), 3);
    }

    #[test]
    fn test_backoff_follows_rate_limit_hint() {
        let configured = Duration::from_secs(5);

        let limited = MonitorError::from(FeedError::Status { status: 429, body: String::new() });
        assert!(limited.is_transient());
        assert_eq!(limited.backoff(configured), Duration::from_secs(30));
        assert_eq!(limited.backoff(Duration::from_secs(60)), Duration::from_secs(60));

        let reset = MonitorError::from(FeedError::Http("connection reset".into()));
        assert!(reset.is_transient());
        assert_eq!(reset.backoff(configured), configured);

        let denied = MonitorError::from(FeedError::Status { status: 401, body: String::new() });
        assert!(!denied.is_transient());
        assert_eq!(denied.backoff(configured), configured);
    }

    #[tokio::test]
    async fn test_start_announces_and_skips_duplicate_refresh() {
        let mut h = harness();
        h.monitor.start(true).await;

        let sent = h.sink.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], SentMessage::Text(t) if t.contains("TROUT Buy Bot Online")));

        // Cycle 0 does not refresh again, so the empty mock queue is not hit.
        h.monitor.run_cycle().await.unwrap();
        assert!(h.monitor.prices().market_loaded);
        assert_eq!(h.monitor.prices().sol_price, 100.0);
    }
}
