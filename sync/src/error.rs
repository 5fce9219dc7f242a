use govsync_store::StoreError;
use thiserror::Error;

/// Errors surfaced to callers of a sync pass.
///
/// Ledger failures never appear here: they degrade to cached values.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),
}
