use std::time::Duration;

use govsync_types::ProposalId;
use thiserror::Error;

/// The whole batch failed; no call in it produced a result.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("ledger endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("ledger request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response from ledger: {0}")]
    InvalidResponse(String),

    #[error("ledger rejected batch: {code} {message}")]
    Rpc { code: i64, message: String },

    #[error("ledger returned {got} results for {expected} calls")]
    ResultCountMismatch { expected: usize, got: usize },
}

/// One call inside a batch failed; the other calls are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("no response for call")]
    MissingResponse,

    #[error("malformed return data: {0}")]
    InvalidReturnData(String),

    #[error("cannot encode call: {0}")]
    Encoding(String),
}

/// Why a typed read for one proposal produced no value.
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    #[error("ledger read for proposal {id} failed: {source}")]
    Call { id: ProposalId, source: CallError },

    #[error("ledger read for proposal {id} returned undecodable data: {reason}")]
    Decode { id: ProposalId, reason: String },

    #[error("ledger batch unavailable: {0}")]
    BatchUnavailable(LedgerError),

    #[error("ledger batch timed out after {0:?}")]
    TimedOut(Duration),
}

impl ReadError {
    /// Whether the failure came from the batch as a whole rather than this call.
    pub fn is_batch_failure(&self) -> bool {
        matches!(self, Self::BatchUnavailable(_) | Self::TimedOut(_))
    }
}
