//! Freshness-driven sync over the store and upstream provider.
//!
//! | Item | Role |
//! |------|------|
//! | [`MarketDataService`] | Cache-aside reads and forced refreshes |
//! | [`BackfillEngine`] | Chunked, resumable price history backfill |
//! | [`SyncScheduler`] | Owned handle to the periodic sync loop |
//! | [`SymbolRegistry`] | Working set of tracked symbols |
//! | [`SyncConfig`] | Knobs with env overrides |

pub mod backfill;
pub mod config;
pub mod error;
mod pacing;
pub mod registry;
pub mod scheduler;
pub mod service;

pub use backfill::{BackfillEngine, BackfillReport};
pub use config::{InitialStart, SyncConfig};
pub use error::SyncError;
pub use registry::SymbolRegistry;
pub use scheduler::{CycleReport, SchedulerStatus, SyncScheduler};
pub use service::MarketDataService;
