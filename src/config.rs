use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{LISTING_API_URL, TELEGRAM_API_BASE};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
///
/// Every field is optional; a missing file or section falls back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub proxies: ProxyConfig,
}

/// Bot credentials and default alert destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token. Empty disables Telegram entirely.
    #[serde(default)]
    pub bot_token: String,
    /// Chat that receives alerts until an operator runs `/setalert`.
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

fn default_telegram_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api_base(),
        }
    }
}

impl TelegramConfig {
    pub fn is_enabled(&self) -> bool {
        !self.bot_token.trim().is_empty()
    }
}

/// Scan loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    /// Seconds between cycle starts.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Items requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Items scanned per cycle, split into pages.
    #[serde(default = "default_total_items")]
    pub total_items: usize,
    /// Per-request timeout, applied to the proxied attempt and the direct retry alike.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub include_nsfw: bool,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_order")]
    pub order: String,
}

fn default_listing_url() -> String {
    LISTING_API_URL.to_string()
}

fn default_poll_interval() -> u64 {
    3
}

fn default_page_size() -> usize {
    48
}

fn default_total_items() -> usize {
    480
}

fn default_request_timeout() -> u64 {
    8
}

fn default_sort() -> String {
    "market_cap".to_string()
}

fn default_order() -> String {
    "DESC".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            poll_interval_secs: default_poll_interval(),
            page_size: default_page_size(),
            total_items: default_total_items(),
            request_timeout_secs: default_request_timeout(),
            include_nsfw: false,
            sort: default_sort(),
            order: default_order(),
        }
    }
}

impl ScanConfig {
    /// Page size, never zero.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }

    /// Items scanned per cycle, never less than one page.
    pub fn effective_total_items(&self) -> usize {
        self.total_items.max(self.effective_page_size())
    }

    /// Offsets of every page in one cycle. The last page may overlap past `total_items`.
    pub fn page_offsets(&self) -> Vec<usize> {
        (0..self.effective_total_items())
            .step_by(self.effective_page_size())
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Where egress proxies come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Inline `host:port` (or full URL) entries.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Optional file with one endpoint per line.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl ProxyConfig {
    /// Inline endpoints followed by file entries, trimmed, blanks and `#` comments dropped.
    ///
    /// An unreadable file is logged and skipped; the scanner then runs on whatever
    /// endpoints remain, or direct.
    pub fn resolve(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .endpoints
            .iter()
            .filter_map(|e| clean_proxy_line(e))
            .collect();

        if let Some(path) = &self.file {
            match std::fs::read_to_string(path) {
                Ok(contents) => out.extend(contents.lines().filter_map(clean_proxy_line)),
                Err(e) => warn!("Failed to read proxy file {}: {e}", path.display()),
            }
        }
        out
    }
}

fn clean_proxy_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    ///
    /// A missing file yields defaults. A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Overlay environment variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`. Empty values are treated as unset; numeric values
    /// that fail to parse are logged and ignored.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = get("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Some(v) = get("SCAN_LISTING_URL") {
            self.scan.listing_url = v;
        }
        parse_into(
            get("SCAN_POLL_INTERVAL_SECS"),
            "SCAN_POLL_INTERVAL_SECS",
            &mut self.scan.poll_interval_secs,
        );
        parse_into(get("SCAN_PAGE_SIZE"), "SCAN_PAGE_SIZE", &mut self.scan.page_size);
        parse_into(get("SCAN_TOTAL_ITEMS"), "SCAN_TOTAL_ITEMS", &mut self.scan.total_items);
        parse_into(
            get("SCAN_REQUEST_TIMEOUT_SECS"),
            "SCAN_REQUEST_TIMEOUT_SECS",
            &mut self.scan.request_timeout_secs,
        );
        if let Some(v) = get("PROXY_FILE") {
            self.proxies.file = Some(PathBuf::from(v));
        }
        if let Some(v) = get("PROXIES") {
            self.proxies.endpoints = v.split(',').filter_map(clean_proxy_line).collect();
        }
    }
}

fn parse_into<T: FromStr>(raw: Option<String>, key: &str, slot: &mut T) {
    if let Some(raw) = raw {
        match raw.trim().parse() {
            Ok(v) => *slot = v,
            Err(_) => warn!("Ignoring {key}={raw:?}: not a valid number"),
        }
    }
}
