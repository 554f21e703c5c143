//! Upstream provider contract.
//!
//! A provider hands back raw market data; identity (symbol) and provenance
//! (source tag) are attached by the caller when records are built. Transport
//! and format failures surface as [`ProviderError`] — the cache-aside and
//! backfill layers normalize them to a miss rather than propagating them to
//! their own callers.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::Symbol;

/// Errors raised by upstream provider adapters.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed upstream payload: {0}")]
    Malformed(String),

    #[error("upstream rejected request: {0}")]
    Upstream(String),
}

/// Raw daily OHLCV row as returned by a provider, before a symbol and
/// source tag are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub adj_close: Option<f64>,
}

/// Contract implemented by upstream market-data sources.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the point-in-time profile payload for a symbol.
    ///
    /// `Ok(None)` means the upstream has nothing for this symbol; it is not
    /// an error. The payload shape is upstream-owned and returned verbatim.
    async fn fetch_snapshot(&self, symbol: &Symbol) -> Result<Option<Value>, ProviderError>;

    /// Fetch daily rows for the inclusive window `[start, end]`, sorted by
    /// date ascending. An empty result is expected for holidays, weekends,
    /// and pre-listing windows.
    async fn fetch_price_range(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRow>, ProviderError>;

    /// Source tag stored on every record written from this provider.
    fn source(&self) -> &str;
}
