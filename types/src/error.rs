//! Parsing errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid proposal id: {0}")]
    InvalidProposalId(String),

    #[error("proposal id exceeds 256 bits: {0}")]
    ProposalIdOverflow(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unknown proposal state code: {0}")]
    UnknownStateCode(u8),
}
