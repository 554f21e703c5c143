//! Chunked historical backfill.
//!
//! Progress is watermark-based: each symbol's resume point is the most
//! recent stored trading date, so a run that stops partway (cancellation,
//! upstream failure, process death) loses nothing — the next run picks up
//! exactly where the durable rows end.

use std::cmp;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use stockpile_core::provider::MarketDataProvider;
use stockpile_core::{PriceRecord, Symbol};
use stockpile_store::Store;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::pacing::wait_or_cancel;

/// Outcome of one backfill pass over a symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub chunks: u32,
    pub rows_written: u64,
    pub cancelled: bool,
    /// An upstream failure ended the pass early. Rows written before the
    /// failure stay durable.
    pub failed: bool,
}

/// Walks a symbol's history gap forward in fixed-size chunks, persisting
/// each chunk before moving on.
#[derive(Clone)]
pub struct BackfillEngine {
    store: Store,
    provider: Arc<dyn MarketDataProvider>,
    config: SyncConfig,
}

impl BackfillEngine {
    pub fn new(store: Store, provider: Arc<dyn MarketDataProvider>, config: SyncConfig) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// Fill the gap between the symbol's watermark and today.
    pub async fn run(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<BackfillReport, SyncError> {
        self.run_until(symbol, Utc::now().date_naive(), cancel).await
    }

    /// Backfill with an explicit end-of-coverage date. Rows are fetched up
    /// to the day before `today`, never for `today` itself, so stored
    /// history holds only completed trading days.
    pub async fn run_until(
        &self,
        symbol: &Symbol,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<BackfillReport, SyncError> {
        let mut report = BackfillReport::default();

        let watermark = self.store.latest_price_date(symbol).await?;
        let mut start = match watermark {
            Some(mark) => mark.checked_add_days(Days::new(1)).unwrap_or(mark),
            None => self.config.initial_start.resolve(today),
        };
        if start >= today {
            debug!(%symbol, ?watermark, "history already current, nothing to backfill");
            return Ok(report);
        }

        info!(%symbol, %start, end = %today, "backfill starting");
        while start < today {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let chunk_end = cmp::min(
                start
                    .checked_add_days(Days::new(u64::from(self.config.chunk_days)))
                    .unwrap_or(today),
                today,
            );
            // chunk_end is exclusive; the provider window is inclusive.
            let fetch_end = chunk_end.checked_sub_days(Days::new(1)).unwrap_or(start);

            let rows = match self
                .provider
                .fetch_price_range(symbol, start, fetch_end)
                .await
            {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(%symbol, %start, %fetch_end, %err,
                        "chunk fetch failed, stopping this symbol's backfill");
                    report.failed = true;
                    break;
                }
            };

            if rows.is_empty() {
                debug!(%symbol, %start, %fetch_end, "no trading days in chunk");
            } else {
                let records: Vec<PriceRecord> = rows
                    .into_iter()
                    .map(|row| PriceRecord::from_row(symbol.clone(), row, self.provider.source()))
                    .collect();
                report.rows_written += self.store.upsert_prices(&records).await?;
            }
            report.chunks += 1;
            start = chunk_end;

            if start < today && wait_or_cancel(cancel, self.config.chunk_delay).await {
                report.cancelled = true;
                break;
            }
        }

        info!(%symbol, chunks = report.chunks, rows = report.rows_written,
            cancelled = report.cancelled, failed = report.failed, "backfill finished");
        Ok(report)
    }
}
