//! Ledger-observed proposal lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// The state of a governance proposal as reported by the Governor contract.
///
/// Discriminants are the contract's `ProposalState` enum codes, which is also
/// how the state is serialized (`"state": 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ProposalState {
    /// Created, voting has not started yet.
    Pending = 0,
    /// Voting is open.
    Active = 1,
    /// Withdrawn by the proposer.
    Canceled = 2,
    /// Voting closed without quorum or majority.
    Defeated = 3,
    /// Voting closed and the proposal passed.
    Succeeded = 4,
    /// Queued in the timelock.
    Queued = 5,
    /// Timelock grace period elapsed without execution.
    Expired = 6,
    /// Executed on-chain.
    Executed = 7,
}

impl ProposalState {
    pub const ALL: [Self; 8] = [
        Self::Pending,
        Self::Active,
        Self::Canceled,
        Self::Defeated,
        Self::Succeeded,
        Self::Queued,
        Self::Expired,
        Self::Executed,
    ];

    /// Decode the contract's numeric state code.
    pub fn from_code(code: u8) -> Result<Self, TypesError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(TypesError::UnknownStateCode(code))
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// No further transition is possible from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Canceled | Self::Defeated | Self::Expired | Self::Executed
        )
    }

    /// Position along the lifecycle `Pending → Active → {Canceled|Defeated|Succeeded}
    /// → Queued → {Expired|Executed}`. States on the same step share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Active => 1,
            Self::Canceled | Self::Defeated | Self::Succeeded => 2,
            Self::Queued => 3,
            Self::Expired | Self::Executed => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Defeated => "defeated",
            Self::Succeeded => "succeeded",
            Self::Queued => "queued",
            Self::Expired => "expired",
            Self::Executed => "executed",
        }
    }
}

impl From<ProposalState> for u8 {
    fn from(state: ProposalState) -> Self {
        state.code()
    }
}

impl TryFrom<u8> for ProposalState {
    type Error = TypesError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
