use std::future::Future;

use anyhow::Result;
use tracing::info;

use crate::types::Item;

/// Delivers a text message to a destination chat.
pub trait Notifier: Send + Sync + 'static {
    fn send(&self, destination: &str, text: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Used when no bot token is configured: alerts only reach the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, destination: &str, text: &str) -> impl Future<Output = Result<()>> + Send {
        info!("[notify -> {destination:?}] {text}");
        std::future::ready(Ok(()))
    }
}

/// Escape the characters legacy Telegram Markdown treats as markup.
pub fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '_' | '*' | '[' | ']' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Compact dollar amount: `1.23M`, `4.56K`, `7.89`.
pub fn format_market_cap(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.2}K", value / 1_000.0)
    } else {
        format!("{value:.2}")
    }
}

pub fn startup_message() -> String {
    "🔍 *Hackathon Scanner Started!*\n\nMonitoring pump.fun for hackathon winners...".to_string()
}

/// Alert body for a newly-flagged item, in Telegram Markdown.
pub fn format_alert(item: &Item) -> String {
    let twitter = item
        .twitter
        .as_deref()
        .map(escape_markdown)
        .unwrap_or_else(|| "N/A".to_string());
    let website = item
        .website
        .as_deref()
        .map(escape_markdown)
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "🚨🏆 *HACKATHON WINNER DETECTED!* 🏆🚨\n\n\
         *{name}* ({symbol})\n\n\
         💰 Market Cap: ${cap}\n\
         📍 Mint: `{mint}`\n\n\
         🔗 [View on Pump.fun]({url})\n\
         🐦 Twitter: {twitter}\n\
         🌐 Website: {website}",
        name = escape_markdown(&item.name),
        symbol = escape_markdown(&item.symbol),
        cap = format_market_cap(item.market_cap_usd),
        mint = item.mint,
        url = item.coin_url(),
    )
}
