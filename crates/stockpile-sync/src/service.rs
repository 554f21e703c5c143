//! Cache-aside reads over the store and upstream provider.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use stockpile_core::provider::MarketDataProvider;
use stockpile_core::{snapshot_payload_is_usable, PriceRecord, SnapshotRecord, Symbol};
use stockpile_store::Store;
use tracing::{debug, warn};

use crate::error::SyncError;

/// Read path shared by the API surface and the scheduler.
///
/// Reads try the store first and go upstream only on a miss, writing the
/// result back so the next read is served locally. Upstream or persistence
/// failures degrade to a miss or an unpersisted response; they never
/// propagate out of the read methods.
#[derive(Clone)]
pub struct MarketDataService {
    store: Store,
    provider: Arc<dyn MarketDataProvider>,
}

impl MarketDataService {
    pub fn new(store: Store, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Snapshot for a symbol: stored copy if present (regardless of age),
    /// otherwise fetched, written back, and returned.
    pub async fn get_snapshot(&self, symbol: &Symbol) -> Option<SnapshotRecord> {
        match self.store.get_snapshot(symbol).await {
            Ok(Some(record)) => {
                debug!(%symbol, "snapshot served from store");
                return Some(record);
            }
            Ok(None) => {}
            Err(err) => warn!(%symbol, %err, "snapshot read failed, going upstream"),
        }

        let payload = match self.provider.fetch_snapshot(symbol).await {
            Ok(Some(payload)) if snapshot_payload_is_usable(&payload) => payload,
            Ok(_) => {
                debug!(%symbol, "upstream has no usable snapshot");
                return None;
            }
            Err(err) => {
                warn!(%symbol, %err, "snapshot fetch failed");
                return None;
            }
        };

        let record =
            SnapshotRecord::new(symbol.clone(), payload, self.provider.source(), Utc::now());
        if let Err(err) = self.store.upsert_snapshot(&record).await {
            warn!(%symbol, %err, "snapshot write-back failed, serving unpersisted payload");
        }
        Some(record)
    }

    /// Daily rows for `[start, end]` inclusive. Any stored rows in the window
    /// count as a hit and are returned as-is; only a completely empty window
    /// triggers an upstream fetch. `None` means the upstream fetch failed or
    /// came back empty.
    pub async fn get_price_range(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<Vec<PriceRecord>> {
        match self.store.prices_in_range(symbol, start, end).await {
            Ok(rows) if !rows.is_empty() => {
                debug!(%symbol, rows = rows.len(), "price range served from store");
                return Some(rows);
            }
            Ok(_) => {}
            Err(err) => warn!(%symbol, %err, "price read failed, going upstream"),
        }

        let fetched = match self.provider.fetch_price_range(symbol, start, end).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(%symbol, %err, "price fetch failed");
                return None;
            }
        };

        if fetched.is_empty() {
            debug!(%symbol, "upstream has no rows for this window");
            return None;
        }

        let records: Vec<PriceRecord> = fetched
            .into_iter()
            .map(|row| PriceRecord::from_row(symbol.clone(), row, self.provider.source()))
            .collect();
        if let Err(err) = self.store.upsert_prices(&records).await {
            warn!(%symbol, %err, "price write-back failed, serving unpersisted rows");
        }
        Some(records)
    }

    /// Unconditional upstream refresh of the snapshot, used by the scheduler.
    /// Returns whether a new payload was stored.
    pub async fn refresh_snapshot(&self, symbol: &Symbol) -> Result<bool, SyncError> {
        let payload = self.provider.fetch_snapshot(symbol).await?;
        match payload {
            Some(payload) if snapshot_payload_is_usable(&payload) => {
                let record = SnapshotRecord::new(
                    symbol.clone(),
                    payload,
                    self.provider.source(),
                    Utc::now(),
                );
                self.store.upsert_snapshot(&record).await?;
                Ok(true)
            }
            _ => {
                debug!(%symbol, "refresh found no usable snapshot, keeping stored copy");
                Ok(false)
            }
        }
    }
}
