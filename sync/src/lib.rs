//! Proposal state synchronization.
//!
//! Mirrors the authoritative state of Governor proposals into a queryable
//! cache while bounding staleness and minimizing ledger reads. One call to
//! [`ProposalSync::sync`] is one synchronization pass:
//!
//! directory → [`select_stale`] → batched ledger read → [`CacheWriter`] →
//! [`compose`] → Pending correction → result.
//!
//! There is no background refresher. Staleness is evaluated lazily per
//! request; overlapping passes are safe because every cache write is a
//! last-write-wins compare-and-set in the store.

pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod staleness;
pub mod writer;

pub use composer::{compose, ProposalStates, ProposalStatus};
pub use config::{SyncConfig, DEFAULT_CACHE_TTL};
pub use engine::{ProposalSync, SyncRequest};
pub use error::SyncError;
pub use metrics::SyncMetrics;
pub use staleness::{select_stale, select_vote_refresh};
pub use writer::{CacheWriter, CommitReport};
