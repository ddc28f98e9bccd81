use std::collections::HashSet;

use tokio::sync::RwLock;

use crate::types::Item;

/// Identifiers of flagged items already alerted on (or absorbed at bootstrap).
///
/// Append-only for the life of the process. `diff_and_record` is the only writer.
#[derive(Debug, Default)]
pub struct KnownSet {
    ids: RwLock<HashSet<String>>,
}

impl KnownSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `flagged` and return the items that were not known before.
    ///
    /// With `bootstrap` set, every identifier is absorbed and nothing is returned, so
    /// whatever is already flagged at startup never alerts. Otherwise new items come back
    /// in the order given; an identifier repeated within `flagged` is returned once.
    pub async fn diff_and_record(&self, flagged: &[Item], bootstrap: bool) -> Vec<Item> {
        if bootstrap {
            let mut ids = self.ids.write().await;
            ids.extend(flagged.iter().map(|item| item.mint.clone()));
            return Vec::new();
        }

        let candidates: Vec<&Item> = {
            let ids = self.ids.read().await;
            flagged
                .iter()
                .filter(|item| !ids.contains(&item.mint))
                .collect()
        };
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut fresh = Vec::with_capacity(candidates.len());
        let mut ids = self.ids.write().await;
        for item in candidates {
            if ids.insert(item.mint.clone()) {
                fresh.push(item.clone());
            }
        }
        fresh
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.ids.read().await.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.ids.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ids.read().await.is_empty()
    }
}
