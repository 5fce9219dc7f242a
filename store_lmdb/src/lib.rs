//! LMDB storage backend for proposal state synchronization.
//!
//! Implements the `govsync-store` traits using the `heed` LMDB bindings.
//! Each logical table maps to one named LMDB database within a single
//! environment.

pub mod directory;
pub mod environment;
pub mod error;
pub mod migration;
pub mod proposal_cache;

pub use directory::LmdbDirectoryStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use proposal_cache::LmdbProposalCacheStore;
