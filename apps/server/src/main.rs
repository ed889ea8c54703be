//! Token Buy Bot - Headless Server
//!
//! Polls recent transactions of one SPL token and posts buy alerts to Telegram.

mod config;
mod monitor;
mod stats;

use buybot_alerts::{AlertSink, LogSink, Notifier, TelegramBot};
use buybot_feeds::{HeliusFetcher, MarketDataClient};
use clap::Parser;
use config::{usd_amount, AppConfig};
use monitor::{Monitor, MonitorSettings};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Token Buy Bot CLI
#[derive(Parser, Debug)]
#[command(name = "buy-bot")]
#[command(about = "Telegram buy alerts for a Solana token", long_about = None)]
struct Args {
    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Minimum buy in USD (overrides MIN_USD_VALUE)
    #[arg(short = 'm', long)]
    min_usd: Option<f64>,

    /// Log alerts instead of sending them to Telegram
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Skip the startup announcement
    #[arg(long, default_value_t = false)]
    no_announce: bool,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn build_sink(config: &AppConfig, dry_run: bool) -> Box<dyn AlertSink> {
    match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) if !dry_run => Box::new(TelegramBot::new(token, chat_id)),
        _ => {
            info!("📝 Dry run: alerts will be logged, not sent");
            Box::new(LogSink)
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_logging(&args.log_level);

    info!("🚀 Token Buy Bot starting...");

    let mut config = match AppConfig::from_env(args.dry_run) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(min_usd) = args.min_usd {
        config.min_usd = match usd_amount("--min-usd", min_usd) {
            Ok(min_usd) => min_usd,
            Err(e) => {
                error!("Configuration error: {}", e);
                std::process::exit(1);
            }
        };
    }

    info!("Configuration:");
    info!("  Mint: {}", config.mint);
    info!("  Min buy: ${:.2}", config.min_usd);
    info!("  Poll interval: {:?}", config.poll_interval);
    info!("  Fetch limit: {}", config.fetch_limit);
    info!("  Dry run: {}", args.dry_run);
    if let Some(path) = &config.image_path {
        info!("  Alert image: {}", path.display());
    }

    let fetcher = match HeliusFetcher::new(config.helius()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to create Helius client: {}", e);
            std::process::exit(1);
        }
    };
    let market = match MarketDataClient::new(config.request_timeout) {
        Ok(market) => market,
        Err(e) => {
            error!("Failed to create market data client: {}", e);
            std::process::exit(1);
        }
    };

    let notifier = Notifier::new(build_sink(&config, args.dry_run), config.notifier());
    let mut monitor = Monitor::new(
        MonitorSettings::from(&config),
        Box::new(fetcher),
        Box::new(market),
        notifier,
    );

    monitor.start(!args.no_announce).await;

    info!("Press Ctrl+C to stop...");

    tokio::select! {
        _ = monitor.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            warn!("Shutdown signal received");
        }
    }

    // Final stats
    let summary = monitor.stats().summary();
    info!("📈 Final Stats:");
    info!("  Total uptime: {} seconds", summary.uptime_secs);
    info!("  Cycles: {} ({} failed)", summary.cycles, summary.failed_cycles);
    info!("  Transactions inspected: {}", summary.transactions_inspected);
    info!("  Buys detected: {} ({} below minimum)", summary.buys_detected, summary.buys_below_minimum);
    info!("  Alerts sent: {} ({} with photo), {} failed", summary.alerts_sent, summary.alerts_photo, summary.alerts_failed);
    info!("  Session resets: {}", summary.session_resets);

    info!("👋 Token Buy Bot stopped");
}
