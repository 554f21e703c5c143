#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate};
use serde_json::{json, Value};
use stockpile_core::provider::{MarketDataProvider, PriceRow, ProviderError};
use stockpile_core::Symbol;
use stockpile_store::{Store, StoreConfig};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub async fn open_store(dir: &TempDir) -> Store {
    let path = dir.path().join("stockpile.db");
    let store = Store::open(StoreConfig::new(format!(
        "sqlite://{}?mode=rwc",
        path.display()
    )))
    .await;
    assert!(store.is_available(), "temp store must open");
    store
}

pub fn symbol(name: &str) -> Symbol {
    Symbol::parse(name).expect("test symbol")
}

/// Coerce a concrete mock handle into the trait object the service and
/// engine constructors take, keeping the original handle for assertions.
pub fn dyn_provider(provider: &Arc<MockProvider>) -> Arc<dyn MarketDataProvider> {
    Arc::clone(provider) as Arc<dyn MarketDataProvider>
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("test date")
}

/// Scripted upstream with call recording.
///
/// Any symbol answers with a usable snapshot payload unless an explicit
/// payload or failure is scripted for it. Price data comes from a fixed set
/// of trading days; each fetch returns the days inside the requested window.
pub struct MockProvider {
    snapshots: HashMap<String, Value>,
    failing_snapshots: HashSet<String>,
    prices_fail: AtomicBool,
    trading_days: Vec<NaiveDate>,
    snapshot_calls: AtomicUsize,
    price_windows: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            snapshots: HashMap::new(),
            failing_snapshots: HashSet::new(),
            prices_fail: AtomicBool::new(false),
            trading_days: Vec::new(),
            snapshot_calls: AtomicUsize::new(0),
            price_windows: Mutex::new(Vec::new()),
            cancel_after: Mutex::new(None),
        }
    }

    pub fn with_snapshot(mut self, name: &str, payload: Value) -> Self {
        self.snapshots.insert(name.to_string(), payload);
        self
    }

    pub fn with_failing_snapshot(mut self, name: &str) -> Self {
        self.failing_snapshots.insert(name.to_string());
        self
    }

    pub fn with_failing_prices(self) -> Self {
        self.prices_fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_trading_days(mut self, days: Vec<NaiveDate>) -> Self {
        self.trading_days = days;
        self
    }

    /// Every calendar day in `[start, end]` trades.
    pub fn with_trading_days_between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        let mut day = start;
        while day <= end {
            self.trading_days.push(day);
            day = day.checked_add_days(Days::new(1)).expect("date range");
        }
        self
    }

    /// Fire `token` once `calls` price fetches have been served.
    pub fn cancelling_after_price_calls(self, calls: usize, token: CancellationToken) -> Self {
        *self.cancel_after.lock().expect("lock") = Some((calls, token));
        self
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub fn price_windows(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.price_windows.lock().expect("lock").clone()
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn fetch_snapshot(&self, symbol: &Symbol) -> Result<Option<Value>, ProviderError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let name = symbol.as_str();
        if self.failing_snapshots.contains(name) {
            return Err(ProviderError::Upstream(format!("scripted failure for {name}")));
        }
        match self.snapshots.get(name) {
            Some(payload) => Ok(Some(payload.clone())),
            None => Ok(Some(json!({"symbol": name, "source": "mock"}))),
        }
    }

    async fn fetch_price_range(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRow>, ProviderError> {
        self.price_windows
            .lock()
            .expect("lock")
            .push((symbol.to_string(), start, end));

        if self.prices_fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Upstream("scripted price failure".into()));
        }

        let rows = self
            .trading_days
            .iter()
            .filter(|day| **day >= start && **day <= end)
            .map(|day| PriceRow {
                date: *day,
                open: Some(10.0),
                high: Some(11.0),
                low: Some(9.0),
                close: Some(f64::from(day.ordinal())),
                volume: Some(1_000),
                adj_close: Some(f64::from(day.ordinal())),
            })
            .collect();

        let mut guard = self.cancel_after.lock().expect("lock");
        if let Some((remaining, token)) = guard.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                token.cancel();
                *guard = None;
            }
        }

        Ok(rows)
    }

    fn source(&self) -> &str {
        "mock"
    }
}
