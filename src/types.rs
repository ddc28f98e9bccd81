use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::COIN_PAGE_BASE;

/// A single listing record as returned by the coins endpoint.
///
/// Only the fields the scanner reads are kept; everything else in the
/// payload is ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Mint address, unique per coin.
    pub mint: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symbol: String,
    /// Server-supplied flag. Trusted as-is; never inferred from other fields.
    #[serde(rename = "is_hackathon", default, deserialize_with = "null_as_false")]
    pub flagged: bool,
    #[serde(rename = "usd_market_cap", default, deserialize_with = "null_as_zero")]
    pub market_cap_usd: f64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub twitter: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub website: Option<String>,
}

impl Item {
    /// Public page for this coin.
    pub fn coin_url(&self) -> String {
        format!("{COIN_PAGE_BASE}/{}", self.mint)
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(d)?.unwrap_or(false))
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn null_as_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(0.0))
}

fn blank_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

/// How a page request was ultimately served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Through the proxy assigned by the rotator.
    Proxy(String),
    /// No proxy was assigned.
    Direct,
    /// The assigned proxy failed at transport level and the direct retry succeeded.
    DirectFallback(String),
}

/// Why a single page contributed nothing to a cycle.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed body: {0}")]
    Decode(String),
    #[error("page task aborted: {0}")]
    Aborted(String),
}

/// Result of fetching one page. Failure is a value, not a propagated error.
#[derive(Debug)]
pub enum PageOutcome {
    Fetched {
        page: usize,
        offset: usize,
        items: Vec<Item>,
        route: Route,
    },
    Failed {
        page: usize,
        offset: usize,
        error: FetchError,
    },
}

impl PageOutcome {
    pub fn page(&self) -> usize {
        match self {
            PageOutcome::Fetched { page, .. } | PageOutcome::Failed { page, .. } => *page,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PageOutcome::Fetched { .. })
    }
}

/// Everything gathered during one cycle.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub cycle: u64,
    /// Items from all successful pages, in page order.
    pub items: Vec<Item>,
    pub elapsed: Duration,
    pub pages_ok: usize,
    pub pages_failed: usize,
}

impl ScanResult {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Flagged subset, in the same order as `items`.
    pub fn flagged(&self) -> Vec<Item> {
        self.items.iter().filter(|i| i.flagged).cloned().collect()
    }

    /// True when at least one page came back.
    pub fn has_coverage(&self) -> bool {
        self.pages_ok > 0
    }
}

/// Emitted once per newly-detected flagged item.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionEvent {
    pub timestamp: String,
    pub cycle: u64,
    pub mint: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_usd: f64,
    pub url: String,
    pub twitter: Option<String>,
    pub website: Option<String>,
}

impl DetectionEvent {
    pub fn new(cycle: u64, item: &Item) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            cycle,
            mint: item.mint.clone(),
            name: item.name.clone(),
            symbol: item.symbol.clone(),
            market_cap_usd: item.market_cap_usd,
            url: item.coin_url(),
            twitter: item.twitter.clone(),
            website: item.website.clone(),
        }
    }
}
