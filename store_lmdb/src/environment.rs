//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::directory::LmdbDirectoryStore;
use crate::migration::Migrator;
use crate::proposal_cache::LmdbProposalCacheStore;
use crate::LmdbError;

const MAX_DBS: u32 = 4;

const DIRECTORY_DB: &str = "proposal_directory";
const CACHE_DB: &str = "proposal_onchain_status";
const META_DB: &str = "meta";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) directory_db: Database<Bytes, Bytes>,
    pub(crate) cache_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path and bring its
    /// schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process for this path
        // and never concurrently truncated or remapped by us.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let directory_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(DIRECTORY_DB))?;
        let cache_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(CACHE_DB))?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            directory_db,
            cache_db,
            meta_db,
        };
        Migrator::run(&environment)?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Handle on the proposal directory table.
    pub fn directory_store(&self) -> LmdbDirectoryStore {
        LmdbDirectoryStore {
            env: Arc::clone(&self.env),
            directory_db: self.directory_db,
        }
    }

    /// Handle on the proposal-state cache table.
    pub fn cache_store(&self) -> LmdbProposalCacheStore {
        LmdbProposalCacheStore {
            env: Arc::clone(&self.env),
            cache_db: self.cache_db,
        }
    }
}
