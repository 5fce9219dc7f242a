//! Ledger call descriptions.

use govsync_types::{Address, ProposalId};

use crate::CallError;

/// Read-only Governor methods this crate knows how to call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedgerMethod {
    /// `state(uint256) returns (uint8)`
    State,
    /// `hasVoted(uint256,address) returns (bool)`
    HasVoted,
}

impl LedgerMethod {
    /// The 4-byte function selector.
    pub fn selector(&self) -> [u8; 4] {
        match self {
            Self::State => [0x3e, 0x4f, 0x49, 0xe6],
            Self::HasVoted => [0x43, 0x85, 0x96, 0x32],
        }
    }

    pub fn signature(&self) -> &'static str {
        match self {
            Self::State => "state(uint256)",
            Self::HasVoted => "hasVoted(uint256,address)",
        }
    }
}

/// A single ABI argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallArg {
    Uint256(ProposalId),
    Address(Address),
}

/// One read-only contract invocation inside a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerCall {
    pub contract: Address,
    pub method: LedgerMethod,
    pub args: Vec<CallArg>,
}

impl LedgerCall {
    /// `state(proposal_id)` on `governor`.
    pub fn state(governor: Address, id: ProposalId) -> Self {
        Self {
            contract: governor,
            method: LedgerMethod::State,
            args: vec![CallArg::Uint256(id)],
        }
    }

    /// `hasVoted(proposal_id, voter)` on `governor`.
    pub fn has_voted(governor: Address, id: ProposalId, voter: Address) -> Self {
        Self {
            contract: governor,
            method: LedgerMethod::HasVoted,
            args: vec![CallArg::Uint256(id), CallArg::Address(voter)],
        }
    }

    /// The proposal id this call is about, if it has one.
    pub fn proposal_id(&self) -> Option<ProposalId> {
        self.args.iter().find_map(|arg| match arg {
            CallArg::Uint256(id) => Some(*id),
            CallArg::Address(_) => None,
        })
    }
}

/// Raw ABI return data of a call, or why that call failed.
pub type CallOutcome = Result<Vec<u8>, CallError>;
