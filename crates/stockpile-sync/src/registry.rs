//! Symbol working set derived from stored snapshots.

use std::time::Duration;

use chrono::{DateTime, Utc};
use stockpile_core::{is_stale, Symbol};
use stockpile_store::Store;
use tracing::warn;

use crate::error::SyncError;

/// The set of symbols the scheduler maintains.
///
/// Membership is implicit: any symbol with a snapshot row is tracked, so a
/// first successful read of a new symbol enrolls it in the next sync cycle.
#[derive(Clone)]
pub struct SymbolRegistry {
    store: Store,
}

impl SymbolRegistry {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Every tracked symbol, in stable (alphabetical) order.
    pub async fn tracked_symbols(&self) -> Result<Vec<Symbol>, SyncError> {
        Ok(self.store.list_symbols().await?)
    }

    /// Tracked symbols whose snapshot is older than `threshold` (or was
    /// never fetched), capped at `cap` in registry order.
    pub async fn due_symbols(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
        cap: usize,
    ) -> Result<Vec<Symbol>, SyncError> {
        let mut due = Vec::new();
        for symbol in self.tracked_symbols().await? {
            let last = self.store.snapshot_last_fetched(&symbol).await?;
            if is_stale(last, now, threshold) {
                due.push(symbol);
            }
        }

        if due.len() > cap {
            warn!(stale = due.len(), cap, "capping symbols for this cycle");
            due.truncate(cap);
        }
        Ok(due)
    }
}
