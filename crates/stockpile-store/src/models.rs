//! Row structs bridging SQLite rows and domain records.

use chrono::{DateTime, NaiveDate, Utc};
use stockpile_core::{PriceRecord, SnapshotRecord, Symbol};

use crate::error::StoreError;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SnapshotRow {
    pub symbol: String,
    pub data: String,
    pub updated_at: DateTime<Utc>,
    pub last_fetched: Option<DateTime<Utc>>,
    pub source: String,
}

impl TryFrom<SnapshotRow> for SnapshotRecord {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let symbol = Symbol::parse(&row.symbol)
            .map_err(|err| StoreError::Malformed(format!("symbol '{}': {err}", row.symbol)))?;
        let data = serde_json::from_str(&row.data)
            .map_err(|err| StoreError::Malformed(format!("snapshot payload for {symbol}: {err}")))?;

        Ok(SnapshotRecord {
            symbol,
            data,
            updated_at: row.updated_at,
            last_fetched: row.last_fetched,
            source: row.source,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PriceDbRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub adj_close: Option<f64>,
    pub source: String,
}

impl TryFrom<PriceDbRow> for PriceRecord {
    type Error = StoreError;

    fn try_from(row: PriceDbRow) -> Result<Self, Self::Error> {
        let symbol = Symbol::parse(&row.symbol)
            .map_err(|err| StoreError::Malformed(format!("symbol '{}': {err}", row.symbol)))?;

        Ok(PriceRecord {
            symbol,
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            adj_close: row.adj_close,
            source: row.source,
        })
    }
}
