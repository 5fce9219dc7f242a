//! LMDB implementation of ProposalDirectory.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use govsync_store::{ProposalDirectory, StoreError};
use govsync_types::{ProposalId, Timestamp};

use crate::LmdbError;

/// Keys are 32-byte big-endian ids, so LMDB's byte order is numeric order.
/// Values hold the registration time (8 bytes, little-endian millis).
pub struct LmdbDirectoryStore {
    pub(crate) env: Arc<Env>,
    pub(crate) directory_db: Database<Bytes, Bytes>,
}

impl LmdbDirectoryStore {
    /// Register a proposal id. Re-registering keeps the original timestamp.
    ///
    /// Used by administrative tooling; the sync core never writes here.
    pub fn register_proposal(
        &self,
        id: &ProposalId,
        registered_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let exists = self
            .directory_db
            .get(&wtxn, id.as_bytes())
            .map_err(LmdbError::from)?
            .is_some();
        if exists {
            return Ok(false);
        }
        self.directory_db
            .put(
                &mut wtxn,
                id.as_bytes(),
                &registered_at.as_millis().to_le_bytes(),
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    pub fn proposal_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.directory_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

impl ProposalDirectory for LmdbDirectoryStore {
    fn list_known_proposal_ids(&self) -> Result<Vec<ProposalId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        let iter = self.directory_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            let arr: [u8; 32] = key
                .try_into()
                .map_err(|_| StoreError::Corruption("invalid proposal id key length".into()))?;
            ids.push(ProposalId::new(arr));
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use crate::LmdbEnvironment;
    use govsync_store::ProposalDirectory;
    use govsync_types::{ProposalId, Timestamp};

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    #[test]
    fn empty_directory_lists_nothing() {
        let (_dir, env) = temp_env();
        let store = env.directory_store();
        assert!(store.list_known_proposal_ids().unwrap().is_empty());
    }

    #[test]
    fn ids_are_listed_in_numeric_order() {
        let (_dir, env) = temp_env();
        let store = env.directory_store();
        for v in [300u64, 2, 1000, 17] {
            store
                .register_proposal(&ProposalId::from_u64(v), Timestamp::from_secs(1))
                .unwrap();
        }
        let ids = store.list_known_proposal_ids().unwrap();
        assert_eq!(
            ids,
            vec![
                ProposalId::from_u64(2),
                ProposalId::from_u64(17),
                ProposalId::from_u64(300),
                ProposalId::from_u64(1000),
            ]
        );
    }

    #[test]
    fn re_registration_is_a_no_op() {
        let (_dir, env) = temp_env();
        let store = env.directory_store();
        let id = ProposalId::from_u64(5);
        assert!(store.register_proposal(&id, Timestamp::from_secs(1)).unwrap());
        assert!(!store.register_proposal(&id, Timestamp::from_secs(2)).unwrap());
        assert_eq!(store.proposal_count().unwrap(), 1);
    }
}
