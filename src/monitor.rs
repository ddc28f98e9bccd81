use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::alerts::{Notifier, format_alert, format_market_cap, startup_message};
use crate::api::PageSource;
use crate::reporter;
use crate::scanner::Scanner;
use crate::state::SharedState;
use crate::types::{DetectionEvent, Item};

/// Periodic scan loop: cycle, diff against the known set, alert on anything new.
pub struct Monitor<S, N> {
    scanner: Scanner<S>,
    notifier: N,
    state: Arc<SharedState>,
    period: Duration,
    bootstrapped: bool,
}

impl<S: PageSource, N: Notifier> Monitor<S, N> {
    pub fn new(
        scanner: Scanner<S>,
        notifier: N,
        state: Arc<SharedState>,
        period: Duration,
    ) -> Self {
        Self {
            scanner,
            notifier,
            state,
            period,
            bootstrapped: false,
        }
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Tell the alert destination the scanner is up.
    pub async fn announce(&self) {
        let destination = self.state.alert_destination().await;
        if let Err(e) = self.notifier.send(&destination, &startup_message()).await {
            warn!("Startup notification failed: {e:#}");
        }
    }

    /// Announce, then cycle forever. The first cycle starts immediately.
    ///
    /// Cycles never overlap. Ticks missed while a cycle overruns fire back-to-back
    /// afterwards, in order.
    pub async fn run(mut self) {
        self.announce().await;
        let mut ticker = tokio::time::interval(self.period);
        loop {
            ticker.tick().await;
            self.process_cycle().await;
        }
    }

    /// Run one cycle and return the items that alerted.
    ///
    /// The first cycle with at least one successful page is the bootstrap: everything
    /// flagged then is absorbed silently. Cycles before it leave the known set untouched.
    pub async fn process_cycle(&mut self) -> Vec<Item> {
        let result = self.scanner.run_cycle().await;
        let flagged = result.flagged();
        reporter::report_cycle(&result, flagged.len());

        if !self.bootstrapped && !result.has_coverage() {
            warn!("[#{}] no pages fetched, deferring bootstrap", result.cycle);
            return Vec::new();
        }

        let bootstrap = !self.bootstrapped;
        let fresh = self.state.known.diff_and_record(&flagged, bootstrap).await;
        if bootstrap {
            self.bootstrapped = true;
            if flagged.is_empty() {
                info!("[INIT] No existing hackathon coins");
            } else {
                info!("[INIT] Found {} existing hackathon coins", flagged.len());
            }
            return fresh;
        }

        if !fresh.is_empty() {
            info!(
                "[#{}] NEW HACKATHON WINNER DETECTED: {} coin(s)",
                result.cycle,
                fresh.len()
            );
        }
        for item in &fresh {
            self.dispatch(result.cycle, item).await;
        }
        fresh
    }

    async fn dispatch(&self, cycle: u64, item: &Item) {
        reporter::report_detection(&DetectionEvent::new(cycle, item));
        info!(
            "[#{cycle}] {} ({}) mcap ${} mint {}",
            item.name,
            item.symbol,
            format_market_cap(item.market_cap_usd),
            item.mint
        );

        let destination = self.state.alert_destination().await;
        match self.notifier.send(&destination, &format_alert(item)).await {
            Ok(()) => info!("Alert sent to {destination} for {}", item.mint),
            Err(e) => warn!("Alert for {} to {destination} failed: {e:#}", item.mint),
        }
    }
}
