//! The ledger read interface.

use async_trait::async_trait;

use crate::{CallOutcome, LedgerCall, LedgerError};

/// Batched, read-only access to the ledger.
///
/// Implementations must issue all `calls` in one round trip and return
/// exactly one outcome per call, in the same order. `Err` is reserved for the
/// batch as a whole failing; a single failing call is an `Err` element.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn batch_read(&self, calls: &[LedgerCall]) -> Result<Vec<CallOutcome>, LedgerError>;
}
