mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use common::{date, dyn_provider, open_store, symbol, MockProvider};
use serde_json::json;
use stockpile_sync::{BackfillEngine, InitialStart, MarketDataService, SyncConfig};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn fast_config(initial: InitialStart, chunk_days: u32) -> SyncConfig {
    SyncConfig {
        initial_start: initial,
        chunk_days,
        chunk_delay: Duration::ZERO,
        rate_limit: Duration::ZERO,
        jitter: Duration::ZERO,
        ..SyncConfig::default()
    }
}

#[tokio::test]
async fn snapshot_is_fetched_once_then_served_from_store() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(MockProvider::new());
    let service = MarketDataService::new(store, dyn_provider(&provider));

    let first = service.get_snapshot(&symbol("AAPL")).await.expect("payload");
    let second = service.get_snapshot(&symbol("AAPL")).await.expect("payload");

    assert_eq!(provider.snapshot_calls(), 1);
    assert_eq!(first.data, second.data);
    assert_eq!(first.source, "mock");
}

#[tokio::test]
async fn unusable_snapshot_payload_is_not_cached() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(MockProvider::new().with_snapshot("EMPT", json!({})));
    let service = MarketDataService::new(store.clone(), dyn_provider(&provider));

    assert!(service.get_snapshot(&symbol("EMPT")).await.is_none());
    assert!(service.get_snapshot(&symbol("EMPT")).await.is_none());

    // Nothing was pinned in the store, so both reads went upstream.
    assert_eq!(provider.snapshot_calls(), 2);
    assert_eq!(store.stats().await.expect("stats").snapshots, 0);
}

#[tokio::test]
async fn upstream_failure_reads_as_a_miss() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(
        MockProvider::new()
            .with_failing_snapshot("AAPL")
            .with_failing_prices(),
    );
    let service = MarketDataService::new(store, dyn_provider(&provider));

    assert!(service.get_snapshot(&symbol("AAPL")).await.is_none());
    assert!(service
        .get_price_range(&symbol("AAPL"), date(2024, 1, 1), date(2024, 1, 10))
        .await
        .is_none());
}

#[tokio::test]
async fn price_range_miss_fetches_and_writes_back() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(
        MockProvider::new().with_trading_days_between(date(2024, 1, 2), date(2024, 1, 4)),
    );
    let service = MarketDataService::new(store.clone(), dyn_provider(&provider));

    let rows = service
        .get_price_range(&symbol("AAPL"), date(2024, 1, 2), date(2024, 1, 4))
        .await
        .expect("rows");
    assert_eq!(rows.len(), 3);

    // Second identical read is served locally.
    let again = service
        .get_price_range(&symbol("AAPL"), date(2024, 1, 2), date(2024, 1, 4))
        .await
        .expect("rows");
    assert_eq!(again.len(), 3);
    assert_eq!(provider.price_windows().len(), 1);
    assert_eq!(store.stats().await.expect("stats").price_rows, 3);
}

#[tokio::test]
async fn partially_covered_range_is_served_without_patching() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(
        MockProvider::new().with_trading_days_between(date(2024, 1, 1), date(2024, 1, 10)),
    );
    let service = MarketDataService::new(store.clone(), dyn_provider(&provider));

    // Seed only two days of a ten-day window.
    service
        .get_price_range(&symbol("AAPL"), date(2024, 1, 2), date(2024, 1, 3))
        .await
        .expect("seed");
    assert_eq!(provider.price_windows().len(), 1);

    // Any stored overlap counts as a hit; the gap is not fetched.
    let rows = service
        .get_price_range(&symbol("AAPL"), date(2024, 1, 1), date(2024, 1, 10))
        .await
        .expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(provider.price_windows().len(), 1);
}

#[tokio::test]
async fn backfill_walks_half_open_chunks_up_to_yesterday() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(
        MockProvider::new().with_trading_days_between(date(2024, 1, 1), date(2024, 1, 31)),
    );
    let config = fast_config(InitialStart::Date(date(2024, 1, 1)), 3);
    let engine = BackfillEngine::new(store.clone(), dyn_provider(&provider), config);

    let report = engine
        .run_until(&symbol("AAPL"), date(2024, 1, 10), &CancellationToken::new())
        .await
        .expect("backfill");

    assert_eq!(report.chunks, 3);
    assert_eq!(report.rows_written, 9);
    assert!(!report.cancelled);
    assert!(!report.failed);

    let expected: Vec<(String, NaiveDate, NaiveDate)> = vec![
        ("AAPL".to_string(), date(2024, 1, 1), date(2024, 1, 3)),
        ("AAPL".to_string(), date(2024, 1, 4), date(2024, 1, 6)),
        ("AAPL".to_string(), date(2024, 1, 7), date(2024, 1, 9)),
    ];
    assert_eq!(provider.price_windows(), expected);

    // Today itself is never fetched; the watermark lands on yesterday.
    assert_eq!(
        store
            .latest_price_date(&symbol("AAPL"))
            .await
            .expect("watermark"),
        Some(date(2024, 1, 9))
    );
}

#[tokio::test]
async fn backfill_resumes_from_the_watermark_without_overlap() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(
        MockProvider::new().with_trading_days_between(date(2024, 1, 1), date(2024, 1, 31)),
    );
    let config = fast_config(InitialStart::Date(date(2024, 1, 1)), 365);
    let engine = BackfillEngine::new(store.clone(), dyn_provider(&provider), config);

    engine
        .run_until(&symbol("AAPL"), date(2024, 1, 6), &CancellationToken::new())
        .await
        .expect("first run");
    let report = engine
        .run_until(&symbol("AAPL"), date(2024, 1, 10), &CancellationToken::new())
        .await
        .expect("second run");

    assert_eq!(report.rows_written, 4);
    let windows = provider.price_windows();
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0], ("AAPL".to_string(), date(2024, 1, 1), date(2024, 1, 5)));
    assert_eq!(windows[1], ("AAPL".to_string(), date(2024, 1, 6), date(2024, 1, 9)));
    assert_eq!(store.stats().await.expect("stats").price_rows, 9);
}

#[tokio::test]
async fn current_history_is_a_noop() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(
        MockProvider::new().with_trading_days_between(date(2024, 1, 1), date(2024, 1, 31)),
    );
    let config = fast_config(InitialStart::Date(date(2024, 1, 1)), 365);
    let engine = BackfillEngine::new(store.clone(), dyn_provider(&provider), config);

    engine
        .run_until(&symbol("AAPL"), date(2024, 1, 10), &CancellationToken::new())
        .await
        .expect("fill");
    let report = engine
        .run_until(&symbol("AAPL"), date(2024, 1, 10), &CancellationToken::new())
        .await
        .expect("rerun");

    assert_eq!(report, stockpile_sync::BackfillReport::default());
    assert_eq!(provider.price_windows().len(), 1);
}

#[tokio::test]
async fn repeated_backfills_are_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(
        MockProvider::new().with_trading_days_between(date(2024, 1, 1), date(2024, 1, 31)),
    );
    let config = fast_config(InitialStart::Date(date(2024, 1, 1)), 3);
    let engine = BackfillEngine::new(store.clone(), dyn_provider(&provider), config);

    engine
        .run_until(&symbol("AAPL"), date(2024, 1, 10), &CancellationToken::new())
        .await
        .expect("first");
    engine
        .run_until(&symbol("AAPL"), date(2024, 1, 10), &CancellationToken::new())
        .await
        .expect("second");

    assert_eq!(store.stats().await.expect("stats").price_rows, 9);
}

#[tokio::test]
async fn empty_upstream_windows_advance_without_writes() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(MockProvider::new());
    let config = fast_config(InitialStart::Date(date(2024, 1, 1)), 3);
    let engine = BackfillEngine::new(store.clone(), dyn_provider(&provider), config);

    let report = engine
        .run_until(&symbol("NEWCO"), date(2024, 1, 10), &CancellationToken::new())
        .await
        .expect("backfill");

    assert_eq!(report.chunks, 3);
    assert_eq!(report.rows_written, 0);
    assert!(store
        .latest_price_date(&symbol("NEWCO"))
        .await
        .expect("watermark")
        .is_none());
}

#[tokio::test]
async fn cancellation_keeps_partial_progress() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let cancel = CancellationToken::new();
    let provider = Arc::new(
        MockProvider::new()
            .with_trading_days_between(date(2024, 1, 1), date(2024, 1, 31))
            .cancelling_after_price_calls(1, cancel.clone()),
    );
    let config = fast_config(InitialStart::Date(date(2024, 1, 1)), 3);
    let engine = BackfillEngine::new(store.clone(), dyn_provider(&provider), config);

    let report = engine
        .run_until(&symbol("AAPL"), date(2024, 1, 10), &cancel)
        .await
        .expect("backfill returns success on cancellation");

    assert!(report.cancelled);
    assert_eq!(report.chunks, 1);
    assert_eq!(report.rows_written, 3);

    // The first chunk's rows are durable; a later run resumes after them.
    assert_eq!(
        store
            .latest_price_date(&symbol("AAPL"))
            .await
            .expect("watermark"),
        Some(date(2024, 1, 3))
    );
}

#[tokio::test]
async fn mid_backfill_upstream_failure_keeps_durable_chunks() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    let provider = Arc::new(
        MockProvider::new().with_trading_days_between(date(2024, 1, 1), date(2024, 1, 31)),
    );
    let config = fast_config(InitialStart::Date(date(2024, 1, 1)), 3);
    let engine = BackfillEngine::new(store.clone(), dyn_provider(&provider), config.clone());

    engine
        .run_until(&symbol("AAPL"), date(2024, 1, 4), &CancellationToken::new())
        .await
        .expect("seed one chunk");

    let failing = Arc::new(MockProvider::new().with_failing_prices());
    let engine = BackfillEngine::new(store.clone(), dyn_provider(&failing), config);
    let report = engine
        .run_until(&symbol("AAPL"), date(2024, 1, 10), &CancellationToken::new())
        .await
        .expect("failure stops the pass without erroring");

    assert!(report.failed);
    assert_eq!(report.chunks, 0);
    assert_eq!(
        store
            .latest_price_date(&symbol("AAPL"))
            .await
            .expect("watermark"),
        Some(date(2024, 1, 3))
    );
}
