//! Abstract storage traits for proposal state synchronization.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The sync engine depends only on the traits, so a store handle is
//! passed in rather than reached through global state.

pub mod directory;
pub mod error;
pub mod proposal_cache;

pub use directory::ProposalDirectory;
pub use error::StoreError;
pub use proposal_cache::{CacheEntry, ProposalCacheStore, UpsertOutcome};
