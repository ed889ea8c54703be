//! HTML message formatting for buy alerts.

use buybot_core::{BuyEvent, PriceSnapshot};
use chrono::DateTime;
use teloxide::utils::html;

/// Default volume emoji.
pub const DEFAULT_EMOJI: &str = "🤖";

/// USD value represented by one volume emoji.
const USD_PER_EMOJI: f64 = 250.0;
const MAX_EMOJIS: usize = 20;

/// Format a number in compact form: `950.0`, `1.2K`, `3.4M`, `5.6B`, `7.8T`.
pub fn format_number(n: f64) -> String {
    let mut value = n;
    for unit in ["", "K", "M", "B"] {
        if value.abs() < 1000.0 {
            return format!("{:.1}{}", value, unit);
        }
        value /= 1000.0;
    }
    format!("{:.1}T", value)
}

/// Format a USD amount with thousands separators and two decimals.
pub fn format_usd(usd: f64) -> String {
    let fixed = format!("{:.2}", usd.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if usd < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// One emoji per $250, at least one and at most twenty.
pub fn volume_emojis(usd: f64, emoji: &str) -> String {
    let count = ((usd / USD_PER_EMOJI).floor().max(0.0) as usize).clamp(1, MAX_EMOJIS);
    emoji.repeat(count)
}

/// Whale-tier label for a buy of the given USD size.
pub fn whale_status(usd: f64) -> &'static str {
    if usd >= 10_000.0 {
        "🐋 Mega Whale"
    } else if usd >= 5_000.0 {
        "🐋 Whale"
    } else if usd >= 2_000.0 {
        "🐬 Dolphin"
    } else if usd >= 1_000.0 {
        "🦈 Shark"
    } else if usd >= 500.0 {
        "🐟 Big Fish"
    } else {
        "🐟 Fish"
    }
}

/// First 12 and last 4 characters of an address.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 16 {
        return address.to_string();
    }
    let head: String = chars[..12].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

fn format_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%I:%M %p").to_string())
        .unwrap_or_default()
}

/// Solscan link for a transaction.
pub fn solscan_url(signature: &str) -> String {
    format!("https://solscan.io/tx/{}", signature)
}

/// Format a buy alert.
pub fn format_buy_alert(event: &BuyEvent, prices: &PriceSnapshot, emoji: &str) -> String {
    let symbol = html::escape(&prices.symbol);

    format!(
        "🛒 <b>{symbol} BUY</b>\n\n\
         {emojis}\n\n\
         💸 <b>{sol:.3} SOL (${usd})</b>\n\
         🐟 {tokens} {symbol}\n\
         👤 <code>{buyer}</code>\n\
         {tier}\n\
         📈 ${price:.8}\n\
         📊 MCap: ${mcap}\n\
         <i>{time} UTC</i>\n\
         <a href=\"{url}\">Txn</a>",
        symbol = symbol,
        emojis = volume_emojis(event.usd, emoji),
        sol = event.sol,
        usd = format_usd(event.usd),
        tokens = format_number(event.tokens),
        buyer = html::escape(&short_address(&event.buyer)),
        tier = whale_status(event.usd),
        price = prices.token_price,
        mcap = format_number(prices.market_cap),
        time = format_time(event.timestamp),
        url = solscan_url(&event.signature),
    )
}

/// Format the announcement sent when the bot comes online.
pub fn format_startup_message(prices: &PriceSnapshot, min_usd: f64) -> String {
    format!(
        "🚀 <b>{} Buy Bot Online</b>\n\n\
         💰 Min Buy: ${}\n\
         💵 Token: ${:.8}\n\
         💎 SOL: ${:.2}\n\
         📊 MCap: ${}",
        html::escape(&prices.symbol),
        format_usd(min_usd),
        prices.token_price,
        prices.sol_price,
        format_number(prices.market_cap),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(usd: f64) -> BuyEvent {
        BuyEvent {
            signature: "5xSig".to_string(),
            buyer: "7YttLkHDoNj9wyDur5pM1ejNaAvT9X4eqaYcHQqtj2G5".to_string(),
            sol: 2.0,
            usd,
            tokens: 20_000.0,
            timestamp: 1_700_000_000,
            payer_strategy: "exact_balance",
        }
    }

    fn prices() -> PriceSnapshot {
        PriceSnapshot {
            token_price: 0.01,
            market_cap: 1_300_000.0,
            symbol: "TROUT".to_string(),
            sol_price: 100.0,
            market_loaded: true,
            sol_loaded: true,
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0.0");
        assert_eq!(format_number(950.0), "950.0");
        assert_eq!(format_number(1_234.0), "1.2K");
        assert_eq!(format_number(3_400_000.0), "3.4M");
        assert_eq!(format_number(5_600_000_000.0), "5.6B");
        assert_eq!(format_number(7_800_000_000_000.0), "7.8T");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(5.0), "5.00");
        assert_eq!(format_usd(200.0), "200.00");
        assert_eq!(format_usd(1_234.5), "1,234.50");
        assert_eq!(format_usd(1_234_567.891), "1,234,567.89");
        assert_eq!(format_usd(-1_000.0), "-1,000.00");
    }

    #[test]
    fn test_volume_emojis() {
        assert_eq!(volume_emojis(5.0, "🤖"), "🤖");
        assert_eq!(volume_emojis(249.99, "🤖"), "🤖");
        assert_eq!(volume_emojis(500.0, "🤖"), "🤖🤖");
        assert_eq!(volume_emojis(1_000_000.0, "🤖"), "🤖".repeat(20));
        assert_eq!(volume_emojis(750.0, "🐟"), "🐟🐟🐟");
    }

    #[test]
    fn test_whale_tiers() {
        assert_eq!(whale_status(10_000.0), "🐋 Mega Whale");
        assert_eq!(whale_status(9_999.99), "🐋 Whale");
        assert_eq!(whale_status(5_000.0), "🐋 Whale");
        assert_eq!(whale_status(2_000.0), "🐬 Dolphin");
        assert_eq!(whale_status(1_000.0), "🦈 Shark");
        assert_eq!(whale_status(500.0), "🐟 Big Fish");
        assert_eq!(whale_status(499.0), "🐟 Fish");
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("7YttLkHDoNj9wyDur5pM1ejNaAvT9X4eqaYcHQqtj2G5"),
            "7YttLkHDoNj9…j2G5"
        );
        assert_eq!(short_address("Addr1"), "Addr1");
    }

    #[test]
    fn test_startup_message_escapes_symbol() {
        let mut snapshot = prices();
        snapshot.symbol = "A&B <x>".to_string();
        assert!(format_startup_message(&snapshot, 20.0).starts_with("🚀 <b>A&amp;B &lt;x&gt; Buy Bot Online</b>"));
    }

    #[test]
    fn test_format_buy_alert() {
        let text = format_buy_alert(&event(200.0), &prices(), DEFAULT_EMOJI);

        assert!(text.starts_with("🛒 <b>TROUT BUY</b>\n\n🤖\n\n"));
        assert!(text.contains("💸 <b>2.000 SOL ($200.00)</b>"));
        assert!(text.contains("🐟 20.0K TROUT"));
        assert!(text.contains("<code>7YttLkHDoNj9…j2G5</code>"));
        assert!(text.contains("🐟 Fish"));
        assert!(text.contains("📈 $0.01000000"));
        assert!(text.contains("MCap: $1.3M"));
        assert!(text.contains("<i>10:13 PM UTC</i>"));
        assert!(text.contains("https://solscan.io/tx/5xSig"));
    }

    #[test]
    fn test_format_buy_alert_escapes_symbol() {
        let mut snapshot = prices();
        snapshot.symbol = "<b>BAD".to_string();
        let text = format_buy_alert(&event(12_500.0), &snapshot, DEFAULT_EMOJI);

        assert!(text.starts_with("🛒 <b>&lt;b&gt;BAD BUY</b>"));
        assert!(text.contains("$12,500.00"));
        assert!(text.contains("🐋 Mega Whale"));
    }

    #[test]
    fn test_format_startup_message() {
        let text = format_startup_message(&prices(), 20.0);
        assert_eq!(
            text,
            "🚀 <b>TROUT Buy Bot Online</b>\n\n\
             💰 Min Buy: $20.00\n\
             💵 Token: $0.01000000\n\
             💎 SOL: $100.00\n\
             📊 MCap: $1.3M"
        );
    }
}
