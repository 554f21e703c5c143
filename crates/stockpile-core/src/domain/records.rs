use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::PriceRow;
use crate::Symbol;

/// Point-in-time snapshot of a symbol's upstream profile.
///
/// The payload is kept as an opaque JSON object because the upstream schema
/// is not under our control; callers project out the fields they need at the
/// point of use. One record per symbol, replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub symbol: Symbol,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
    /// When the payload was last pulled from upstream. `None` only for
    /// records written before this field existed; treated as stale.
    pub last_fetched: Option<DateTime<Utc>>,
    pub source: String,
}

impl SnapshotRecord {
    /// Build a fresh record from an upstream payload.
    pub fn new(symbol: Symbol, data: Value, source: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            symbol,
            data,
            updated_at: now,
            last_fetched: Some(now),
            source: source.into(),
        }
    }
}

/// Daily OHLCV row, uniquely keyed by `(symbol, date)`.
///
/// Individual fields are optional because upstream sources publish partial
/// rows (missing volume on indices, missing adjusted close on fresh IPOs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub symbol: Symbol,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub adj_close: Option<f64>,
    pub source: String,
}

impl PriceRecord {
    /// Attach identity and provenance to a raw provider row.
    pub fn from_row(symbol: Symbol, row: PriceRow, source: impl Into<String>) -> Self {
        Self {
            symbol,
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            adj_close: row.adj_close,
            source: source.into(),
        }
    }
}

/// Whether an upstream snapshot payload is worth caching.
///
/// Empty or non-object payloads are what Yahoo returns for unknown symbols;
/// writing them would pin a useless record under the symbol key.
pub fn snapshot_payload_is_usable(payload: &Value) -> bool {
    payload.as_object().is_some_and(|map| !map.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_snapshot_sets_both_timestamps() {
        let now = Utc::now();
        let symbol = Symbol::parse("AAPL").expect("symbol");
        let record = SnapshotRecord::new(symbol, json!({"currency": "USD"}), "yahoo", now);
        assert_eq!(record.updated_at, now);
        assert_eq!(record.last_fetched, Some(now));
        assert_eq!(record.source, "yahoo");
    }

    #[test]
    fn usable_payload_requires_non_empty_object() {
        assert!(snapshot_payload_is_usable(&json!({"price": 1.0})));
        assert!(!snapshot_payload_is_usable(&json!({})));
        assert!(!snapshot_payload_is_usable(&json!(null)));
        assert!(!snapshot_payload_is_usable(&json!([1, 2, 3])));
    }
}
