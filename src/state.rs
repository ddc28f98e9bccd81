use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::tracker::KnownSet;

/// Cycle counter. Written by the scanner, read by `/status`.
#[derive(Debug, Default)]
pub struct ScanCounters {
    cycles: AtomicU64,
}

impl ScanCounters {
    /// Start a new cycle and return its number (first cycle is 1).
    pub fn begin_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }
}

/// State shared between the scan loop and the command listener.
///
/// Built once at startup and handed to both loops behind an `Arc`.
#[derive(Debug)]
pub struct SharedState {
    pub known: KnownSet,
    pub counters: ScanCounters,
    alert_destination: RwLock<String>,
    proxy_count: usize,
}

impl SharedState {
    pub fn new(alert_destination: impl Into<String>, proxy_count: usize) -> Self {
        Self {
            known: KnownSet::new(),
            counters: ScanCounters::default(),
            alert_destination: RwLock::new(alert_destination.into()),
            proxy_count,
        }
    }

    /// Chat that currently receives alerts.
    pub async fn alert_destination(&self) -> String {
        self.alert_destination.read().await.clone()
    }

    /// Redirect alerts; returns the previous destination.
    pub async fn set_alert_destination(&self, destination: impl Into<String>) -> String {
        let mut slot = self.alert_destination.write().await;
        std::mem::replace(&mut *slot, destination.into())
    }

    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }
}
