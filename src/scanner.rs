use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::api::PageSource;
use crate::state::SharedState;
use crate::types::{FetchError, PageOutcome, Route, ScanResult};

/// Fans one cycle out into concurrent page fetches and merges whatever comes back.
pub struct Scanner<S> {
    source: Arc<S>,
    offsets: Vec<usize>,
    state: Arc<SharedState>,
}

impl<S: PageSource> Scanner<S> {
    pub fn new(source: Arc<S>, offsets: Vec<usize>, state: Arc<SharedState>) -> Self {
        Self {
            source,
            offsets,
            state,
        }
    }

    pub fn page_count(&self) -> usize {
        self.offsets.len()
    }

    /// Run one cycle: fetch every page concurrently, wait for all of them, merge.
    ///
    /// Failed pages only shrink coverage. A cycle where every page fails still returns
    /// a (empty) result.
    pub async fn run_cycle(&self) -> ScanResult {
        let cycle = self.state.counters.begin_cycle();
        let start = Instant::now();

        let outcomes = self.fetch_all().await;

        let mut result = ScanResult {
            cycle,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                PageOutcome::Fetched {
                    page, items, route, ..
                } => {
                    if let Route::DirectFallback(proxy) = &route {
                        debug!("[#{cycle}] page {page}: proxy {proxy} failed, served direct");
                    }
                    result.pages_ok += 1;
                    result.items.extend(items);
                }
                PageOutcome::Failed {
                    page,
                    offset,
                    error,
                } => {
                    debug!("[#{cycle}] page {page} (offset {offset}) failed: {error}");
                    result.pages_failed += 1;
                }
            }
        }
        result.elapsed = start.elapsed();

        if result.pages_failed > 0 {
            warn!(
                "[#{cycle}] {}/{} pages failed",
                result.pages_failed,
                self.offsets.len()
            );
        }
        debug!(
            "[#{cycle}] {} items from {} pages in {}ms",
            result.item_count(),
            result.pages_ok,
            result.elapsed.as_millis()
        );
        result
    }

    /// One task per page; each writes exactly one outcome into a channel sized to the
    /// page count. Returns once every task has finished, sorted by page index.
    async fn fetch_all(&self) -> Vec<PageOutcome> {
        let (tx, mut rx) = mpsc::channel(self.offsets.len().max(1));
        let mut tasks = JoinSet::new();

        for (page, &offset) in self.offsets.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let tx = tx.clone();
            tasks.spawn(async move {
                let outcome = source.fetch_page(page, offset).await;
                // Capacity covers every page, so this never waits.
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Page task did not complete: {e}");
            }
        }

        let mut reported = vec![false; self.offsets.len()];
        let mut outcomes = Vec::with_capacity(self.offsets.len());
        while let Some(outcome) = rx.recv().await {
            if let Some(seen) = reported.get_mut(outcome.page()) {
                *seen = true;
            }
            outcomes.push(outcome);
        }

        // A task that panicked never sent; count its page as failed.
        for (page, seen) in reported.iter().enumerate() {
            if !seen {
                outcomes.push(PageOutcome::Failed {
                    page,
                    offset: self.offsets[page],
                    error: FetchError::Aborted("task ended without a result".into()),
                });
            }
        }

        outcomes.sort_by_key(PageOutcome::page);
        outcomes
    }
}
