//! # Stockpile Core
//!
//! Domain contracts for the stockpile market-data cache.
//!
//! This crate provides the foundational pieces shared by the store and the
//! sync engine:
//!
//! - **Canonical domain models** for snapshot and daily price records
//! - **Symbol** parsing and normalization
//! - **Freshness policy** deciding when a cached record is due for refresh
//! - **Provider contract** ([`MarketDataProvider`]) for upstream data sources
//! - **Adapters** implementing the provider contract (Yahoo Finance)
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo) |
//! | [`domain`] | Domain models (Symbol, SnapshotRecord, PriceRecord) |
//! | [`error`] | Core error types |
//! | [`freshness`] | Staleness decision function |
//! | [`provider`] | Upstream provider trait and row types |

pub mod adapters;
pub mod domain;
pub mod error;
pub mod freshness;
pub mod provider;

pub use adapters::YahooProvider;
pub use domain::{
    snapshot_payload_is_usable, PriceRecord, SnapshotRecord, Symbol,
};
pub use error::ValidationError;
pub use freshness::is_stale;
pub use provider::{MarketDataProvider, PriceRow, ProviderError};
