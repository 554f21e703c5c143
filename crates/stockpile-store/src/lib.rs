//! SQLite persistence for snapshots and daily prices.
//!
//! | Item | Role |
//! |------|------|
//! | [`Store`] | Pooled handle over the two tables, with all queries |
//! | [`StoreConfig`] | Connection URL and pool sizing |
//! | [`StoreError`] | Connection, query, and row-decoding failures |
//!
//! A store that fails to connect at startup comes up *disabled* rather than
//! aborting the process: every read answers a miss and every write is a
//! logged no-op, so the service keeps serving upstream data without
//! persistence until the database returns.

pub mod error;
mod models;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use stockpile_core::{PriceRecord, SnapshotRecord, Symbol};
use tracing::{error, info, warn};

pub use error::StoreError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for [`Store::open`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite URL, e.g. `sqlite://stockpile.db?mode=rwc`.
    pub url: String,
    pub max_connections: u32,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Row counts reported by [`Store::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub snapshots: i64,
    pub price_rows: i64,
}

/// Handle over the snapshot and price tables.
///
/// `pool` is `None` when the store is disabled; every method checks it and
/// degrades to a miss or no-op instead of erroring.
#[derive(Debug, Clone)]
pub struct Store {
    pool: Option<SqlitePool>,
}

impl Store {
    /// Connect and ensure the schema exists. Connection failure produces a
    /// disabled store, not an error.
    pub async fn open(config: StoreConfig) -> Self {
        match Self::connect(&config).await {
            Ok(pool) => {
                info!(url = %config.url, "store ready");
                Self { pool: Some(pool) }
            }
            Err(err) => {
                error!(%err, url = %config.url, "store unavailable, running without persistence");
                Self { pool: None }
            }
        }
    }

    /// A store that is disabled from the start. Used when persistence is
    /// explicitly switched off.
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    async fn connect(config: &StoreConfig) -> Result<SqlitePool, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        initialize_schema(&pool).await?;
        Ok(pool)
    }

    pub fn is_available(&self) -> bool {
        self.pool.is_some()
    }

    /// Cached snapshot for a symbol, or `None` on miss or disabled store.
    pub async fn get_snapshot(&self, symbol: &Symbol) -> Result<Option<SnapshotRecord>, StoreError> {
        let Some(pool) = self.pool.as_ref() else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, models::SnapshotRow>(
            "SELECT symbol, data, updated_at, last_fetched, source
             FROM snapshots WHERE symbol = ?1",
        )
        .bind(symbol.as_str())
        .fetch_optional(pool)
        .await?;

        row.map(SnapshotRecord::try_from).transpose()
    }

    /// Insert or replace the snapshot row for the record's symbol.
    pub async fn upsert_snapshot(&self, record: &SnapshotRecord) -> Result<(), StoreError> {
        let Some(pool) = self.pool.as_ref() else {
            warn!(symbol = %record.symbol, "store disabled, snapshot not persisted");
            return Ok(());
        };

        let data = serde_json::to_string(&record.data)
            .map_err(|err| StoreError::Malformed(err.to_string()))?;

        sqlx::query(
            "INSERT OR REPLACE INTO snapshots (symbol, data, updated_at, last_fetched, source)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(record.symbol.as_str())
        .bind(data)
        .bind(record.updated_at)
        .bind(record.last_fetched)
        .bind(&record.source)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// `last_fetched` for a symbol's snapshot; `None` when no row exists or
    /// the row predates fetch tracking.
    pub async fn snapshot_last_fetched(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(pool) = self.pool.as_ref() else {
            return Ok(None);
        };

        let value = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT last_fetched FROM snapshots WHERE symbol = ?1",
        )
        .bind(symbol.as_str())
        .fetch_optional(pool)
        .await?;

        Ok(value.flatten())
    }

    /// Every symbol with a snapshot row, ordered. This is the sync
    /// scheduler's working set.
    pub async fn list_symbols(&self) -> Result<Vec<Symbol>, StoreError> {
        let Some(pool) = self.pool.as_ref() else {
            return Ok(Vec::new());
        };

        let names = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT symbol FROM snapshots ORDER BY symbol",
        )
        .fetch_all(pool)
        .await?;

        let mut symbols = Vec::with_capacity(names.len());
        for name in names {
            match Symbol::parse(&name) {
                Ok(symbol) => symbols.push(symbol),
                Err(err) => warn!(symbol = %name, %err, "skipping unparseable stored symbol"),
            }
        }
        Ok(symbols)
    }

    /// Daily rows for the inclusive window `[start, end]`, date ascending.
    pub async fn prices_in_range(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        let Some(pool) = self.pool.as_ref() else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as::<_, models::PriceDbRow>(
            "SELECT symbol, date, open, high, low, close, volume, adj_close, source
             FROM prices
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )
        .bind(symbol.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(PriceRecord::try_from).collect()
    }

    /// Insert or replace a batch of price rows in one transaction. Returns
    /// the number of rows written; a re-run over the same window rewrites
    /// rows in place rather than duplicating them.
    pub async fn upsert_prices(&self, records: &[PriceRecord]) -> Result<u64, StoreError> {
        let Some(pool) = self.pool.as_ref() else {
            if !records.is_empty() {
                warn!(rows = records.len(), "store disabled, price rows not persisted");
            }
            return Ok(0);
        };
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        for record in records {
            sqlx::query(
                "INSERT OR REPLACE INTO prices
                     (symbol, date, open, high, low, close, volume, adj_close, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(record.symbol.as_str())
            .bind(record.date)
            .bind(record.open)
            .bind(record.high)
            .bind(record.low)
            .bind(record.close)
            .bind(record.volume)
            .bind(record.adj_close)
            .bind(&record.source)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(records.len() as u64)
    }

    /// Most recent stored trading date for a symbol. This is the backfill
    /// watermark; `None` means the symbol has no history yet.
    pub async fn latest_price_date(&self, symbol: &Symbol) -> Result<Option<NaiveDate>, StoreError> {
        let Some(pool) = self.pool.as_ref() else {
            return Ok(None);
        };

        let date = sqlx::query_scalar::<_, Option<NaiveDate>>(
            "SELECT MAX(date) FROM prices WHERE symbol = ?1",
        )
        .bind(symbol.as_str())
        .fetch_one(pool)
        .await?;

        Ok(date)
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let Some(pool) = self.pool.as_ref() else {
            return Ok(StoreStats::default());
        };

        let snapshots = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM snapshots")
            .fetch_one(pool)
            .await?;
        let price_rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM prices")
            .fetch_one(pool)
            .await?;

        Ok(StoreStats {
            snapshots,
            price_rows,
        })
    }
}

async fn initialize_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS snapshots (
             symbol       TEXT PRIMARY KEY,
             data         TEXT NOT NULL,
             updated_at   TEXT NOT NULL,
             last_fetched TEXT,
             source       TEXT NOT NULL
         )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS prices (
             symbol    TEXT NOT NULL,
             date      TEXT NOT NULL,
             open      REAL,
             high      REAL,
             low       REAL,
             close     REAL,
             volume    INTEGER,
             adj_close REAL,
             source    TEXT NOT NULL,
             PRIMARY KEY (symbol, date)
         )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
