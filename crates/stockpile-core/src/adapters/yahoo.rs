//! Yahoo Finance provider adapter.
//!
//! Uses the unauthenticated v8 chart endpoint for both daily history and the
//! snapshot payload (the chart `meta` object). Yahoo serves this endpoint
//! without a crumb as long as a browser user-agent is presented.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::snapshot_payload_is_usable;
use crate::provider::{MarketDataProvider, PriceRow, ProviderError};
use crate::Symbol;

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upstream adapter for Yahoo Finance daily data.
#[derive(Debug, Clone)]
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self::with_base_url(CHART_BASE_URL)
    }

    /// Point the adapter at an alternate chart endpoint (test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn get_chart(
        &self,
        symbol: &Symbol,
        query: &[(&str, String)],
    ) -> Result<ChartResult, ProviderError> {
        let url = format!("{}/{}", self.base_url, symbol);
        debug!(%symbol, url, "requesting yahoo chart");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Upstream(format!(
                "HTTP {status} from chart endpoint"
            )));
        }

        let body = response.text().await?;
        parse_chart(&body)
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn fetch_snapshot(&self, symbol: &Symbol) -> Result<Option<Value>, ProviderError> {
        let query = [
            ("range", "5d".to_string()),
            ("interval", "1d".to_string()),
        ];
        let chart = self.get_chart(symbol, &query).await?;

        if snapshot_payload_is_usable(&chart.meta) {
            Ok(Some(chart.meta))
        } else {
            Ok(None)
        }
    }

    async fn fetch_price_range(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRow>, ProviderError> {
        // The chart API takes a half-open [period1, period2) window of unix
        // seconds; push period2 past midnight of `end` to keep the requested
        // window inclusive.
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end
            .checked_add_days(Days::new(1))
            .unwrap_or(end)
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        let query = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
            ("events", "div,split".to_string()),
        ];
        let chart = self.get_chart(symbol, &query).await?;
        Ok(rows_from_chart(chart, start, end))
    }

    fn source(&self) -> &str {
        "yahoo"
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Value,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    adjclose: Option<Vec<AdjCloseBlock>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn parse_chart(body: &str) -> Result<ChartResult, ProviderError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|err| ProviderError::Malformed(err.to_string()))?;

    if let Some(error) = response.chart.error {
        return Err(ProviderError::Upstream(error.description));
    }

    response
        .chart
        .result
        .and_then(|mut results| {
            if results.is_empty() {
                None
            } else {
                Some(results.remove(0))
            }
        })
        .ok_or_else(|| ProviderError::Malformed("chart response carried no result".into()))
}

/// Flatten the columnar chart arrays into dated rows, clipped to the
/// requested window.
fn rows_from_chart(chart: ChartResult, start: NaiveDate, end: NaiveDate) -> Vec<PriceRow> {
    let quote = chart.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = chart
        .indicators
        .adjclose
        .and_then(|blocks| blocks.into_iter().next().map(|block| block.adjclose))
        .unwrap_or_default();

    let mut rows: Vec<PriceRow> = Vec::with_capacity(chart.timestamp.len());
    for (index, ts) in chart.timestamp.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        if date < start || date > end {
            continue;
        }
        // Yahoo repeats the live candle's timestamp on the final slot; keep
        // the first occurrence of each date.
        if rows.last().is_some_and(|row: &PriceRow| row.date == date) {
            continue;
        }

        rows.push(PriceRow {
            date,
            open: column(&quote.open, index),
            high: column(&quote.high, index),
            low: column(&quote.low, index),
            close: column(&quote.close, index),
            volume: column(&quote.volume, index),
            adj_close: column(&adjclose, index),
        });
    }

    rows
}

fn column<T: Copy>(values: &[Option<T>], index: usize) -> Option<T> {
    values.get(index).copied().flatten()
}
