use stockpile_core::provider::ProviderError;
use stockpile_store::StoreError;
use thiserror::Error;

/// Errors raised by sync-layer operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upstream(#[from] ProviderError),
}
