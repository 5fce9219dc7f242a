//! Fundamental types for governance proposal state synchronization.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! proposal identifiers, ledger-observed proposal states, EVM addresses and
//! caller identities, timestamps, and the clock abstraction.

pub mod address;
pub mod error;
pub mod proposal_id;
pub mod state;
pub mod time;

pub use address::{Address, Identity};
pub use error::TypesError;
pub use proposal_id::ProposalId;
pub use state::ProposalState;
pub use time::{Clock, SystemClock, Timestamp};
