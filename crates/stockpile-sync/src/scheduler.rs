//! Periodic sync scheduler.
//!
//! One controller task loops forever: assemble the due working set, refresh
//! each symbol (snapshot then backfill) with pacing between symbols, then
//! wait out the configured frequency. Every pause is cancellation-aware, so
//! `stop` takes effect at the next pause or loop check rather than after a
//! full sleep. Manual cycles dispatched with `run_now` observe the same
//! lifetime token, so `stop` ends them too.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stockpile_core::provider::MarketDataProvider;
use stockpile_core::Symbol;
use stockpile_store::Store;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backfill::BackfillEngine;
use crate::config::SyncConfig;
use crate::pacing::{jittered, wait_or_cancel};
use crate::registry::SymbolRegistry;
use crate::service::MarketDataService;

const STOP_TIMEOUT: Duration = Duration::from_secs(10);
const RECOVERY_BACKOFF: Duration = Duration::from_secs(300);
const SNAPSHOT_BACKFILL_PAUSE: Duration = Duration::from_millis(500);

/// Point-in-time view of the scheduler for the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub running: bool,
    pub store_available: bool,
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Symbols selected as due this cycle.
    pub selected: usize,
    pub refreshed: usize,
    pub failed: usize,
    pub cancelled: bool,
    /// The cycle itself could not run (working set unavailable); the loop
    /// retries after a recovery backoff instead of the full frequency.
    pub faulted: bool,
}

struct SchedulerState {
    /// Parent token for the controller loop and any manual cycles. `stop`
    /// cancels it; `start` replaces a cancelled one.
    lifetime: CancellationToken,
    task: Option<JoinHandle<()>>,
}

struct SchedulerInner {
    service: MarketDataService,
    backfill: BackfillEngine,
    registry: SymbolRegistry,
    config: SyncConfig,
    state: Mutex<SchedulerState>,
}

/// Owned handle to the periodic sync loop.
///
/// Cheap to clone; all clones control the same loop. Dropping every handle
/// while the loop runs leaves the spawned task alive until the runtime shuts
/// down, so callers should `stop` before teardown.
#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<SchedulerInner>,
}

impl SyncScheduler {
    pub fn new(store: Store, provider: Arc<dyn MarketDataProvider>, config: SyncConfig) -> Self {
        let service = MarketDataService::new(store.clone(), Arc::clone(&provider));
        let backfill = BackfillEngine::new(store.clone(), provider, config.clone());
        let registry = SymbolRegistry::new(store);
        Self {
            inner: Arc::new(SchedulerInner {
                service,
                backfill,
                registry,
                config,
                state: Mutex::new(SchedulerState {
                    lifetime: CancellationToken::new(),
                    task: None,
                }),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn service(&self) -> &MarketDataService {
        &self.inner.service
    }

    /// Spawn the periodic loop. No-op when it is already running.
    pub async fn start(&self) {
        let mut state = self.inner.state.lock().await;
        if state.task.as_ref().is_some_and(|task| !task.is_finished()) {
            warn!("scheduler already running");
            return;
        }
        if state.lifetime.is_cancelled() {
            state.lifetime = CancellationToken::new();
        }

        let inner = Arc::clone(&self.inner);
        let cancel = state.lifetime.child_token();
        state.task = Some(tokio::spawn(async move {
            controller_loop(inner, cancel).await;
        }));
        info!("scheduler started");
    }

    /// Cancel the loop and any manual cycles, then wait a bounded time for
    /// the loop to wind down.
    pub async fn stop(&self) {
        let task = {
            let mut state = self.inner.state.lock().await;
            state.lifetime.cancel();
            state.task.take()
        };
        let Some(task) = task else {
            info!("scheduler not running");
            return;
        };

        match tokio::time::timeout(STOP_TIMEOUT, task).await {
            Ok(Ok(())) => info!("scheduler stopped"),
            Ok(Err(err)) => error!(%err, "scheduler task failed during shutdown"),
            Err(_) => warn!(timeout = ?STOP_TIMEOUT, "scheduler still winding down, detaching"),
        }
    }

    /// Kick off one cycle in the background, independent of the periodic
    /// timer. Fire-and-forget; progress appears in the logs. The cycle
    /// shares the scheduler's lifetime token, so `stop` cancels it.
    pub async fn run_now(&self) {
        let cancel = self.inner.state.lock().await.lifetime.child_token();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            run_single_cycle(&inner, &cancel).await;
        });
        info!("manual sync cycle dispatched");
    }

    /// Run one cycle to completion on the caller's task.
    pub async fn run_cycle(&self) -> CycleReport {
        let cancel = self.inner.state.lock().await.lifetime.child_token();
        run_single_cycle(&self.inner, &cancel).await
    }

    pub async fn status(&self) -> SchedulerStatus {
        let state = self.inner.state.lock().await;
        let running = state.task.as_ref().is_some_and(|task| !task.is_finished());
        SchedulerStatus {
            running,
            store_available: self.inner.service.store().is_available(),
        }
    }
}

async fn controller_loop(inner: Arc<SchedulerInner>, cancel: CancellationToken) {
    info!(frequency = ?inner.config.run_frequency, "sync loop online");
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let report = run_single_cycle(&inner, &cancel).await;
        let wait = if report.faulted {
            warn!(backoff = ?RECOVERY_BACKOFF, "cycle faulted, retrying after backoff");
            RECOVERY_BACKOFF
        } else {
            inner.config.run_frequency
        };

        if wait_or_cancel(&cancel, wait).await {
            break;
        }
    }
    info!("sync loop offline");
}

async fn run_single_cycle(inner: &SchedulerInner, cancel: &CancellationToken) -> CycleReport {
    let mut report = CycleReport::default();

    let due = match inner
        .registry
        .due_symbols(
            Utc::now(),
            inner.config.staleness_threshold,
            inner.config.max_symbols_per_run,
        )
        .await
    {
        Ok(due) => due,
        Err(err) => {
            error!(%err, "could not assemble working set");
            report.faulted = true;
            return report;
        }
    };

    report.selected = due.len();
    if due.is_empty() {
        info!("no symbols due for refresh");
        return report;
    }
    info!(due = report.selected, "sync cycle starting");

    for symbol in due {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let pause = jittered(inner.config.rate_limit, inner.config.jitter);
        if wait_or_cancel(cancel, pause).await {
            report.cancelled = true;
            break;
        }

        if refresh_symbol(inner, &symbol, cancel).await {
            report.refreshed += 1;
        } else {
            report.failed += 1;
        }
    }

    info!(
        selected = report.selected,
        refreshed = report.refreshed,
        failed = report.failed,
        cancelled = report.cancelled,
        "sync cycle finished"
    );
    report
}

/// Refresh one symbol's snapshot and history. A snapshot failure does not
/// skip the backfill; the symbol only counts as refreshed when both steps
/// succeed.
async fn refresh_symbol(
    inner: &SchedulerInner,
    symbol: &Symbol,
    cancel: &CancellationToken,
) -> bool {
    let snapshot_ok = match inner.service.refresh_snapshot(symbol).await {
        Ok(stored) => {
            if !stored {
                warn!(%symbol, "upstream returned no usable snapshot");
            }
            stored
        }
        Err(err) => {
            warn!(%symbol, %err, "snapshot refresh failed");
            false
        }
    };

    if wait_or_cancel(cancel, SNAPSHOT_BACKFILL_PAUSE).await {
        return snapshot_ok;
    }

    let backfill_ok = match inner.backfill.run(symbol, cancel).await {
        Ok(backfill) => !backfill.failed,
        Err(err) => {
            warn!(%symbol, %err, "backfill failed");
            false
        }
    };

    snapshot_ok && backfill_ok
}
