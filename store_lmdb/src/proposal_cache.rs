//! LMDB implementation of ProposalCacheStore.
//!
//! Every upsert reads, merges and writes inside a single write transaction.
//! LMDB admits one writer at a time, so the merge is a true compare-and-set
//! even when several sync passes commit the same proposal concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use govsync_store::proposal_cache::{merge_state, merge_vote};
use govsync_store::{CacheEntry, ProposalCacheStore, StoreError, UpsertOutcome};
use govsync_types::{Identity, ProposalId, ProposalState, Timestamp};

use crate::LmdbError;

pub struct LmdbProposalCacheStore {
    pub(crate) env: Arc<Env>,
    pub(crate) cache_db: Database<Bytes, Bytes>,
}

impl LmdbProposalCacheStore {
    fn read_entry(&self, txn: &RoTxn, id: &ProposalId) -> Result<Option<CacheEntry>, LmdbError> {
        match self.cache_db.get(txn, id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn write_entry(
        &self,
        txn: &mut heed::RwTxn,
        id: &ProposalId,
        entry: &CacheEntry,
    ) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(entry)?;
        self.cache_db.put(txn, id.as_bytes(), &bytes)?;
        Ok(())
    }
}

impl ProposalCacheStore for LmdbProposalCacheStore {
    fn get_entry(&self, id: &ProposalId) -> Result<Option<CacheEntry>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.read_entry(&rtxn, id)?)
    }

    fn load_entries(&self) -> Result<HashMap<ProposalId, CacheEntry>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut entries = HashMap::new();
        let iter = self.cache_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (key, value) = result.map_err(LmdbError::from)?;
            let arr: [u8; 32] = key
                .try_into()
                .map_err(|_| StoreError::Corruption("invalid proposal id key length".into()))?;
            let entry: CacheEntry = bincode::deserialize(value).map_err(LmdbError::from)?;
            entries.insert(ProposalId::new(arr), entry);
        }
        Ok(entries)
    }

    fn upsert_state(
        &self,
        id: &ProposalId,
        state: ProposalState,
        checked_at: Timestamp,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existing = self.read_entry(&wtxn, id)?;
        let (merged, outcome) = merge_state(existing, state, checked_at);
        if outcome.needs_write() {
            self.write_entry(&mut wtxn, id, &merged)?;
            wtxn.commit().map_err(LmdbError::from)?;
        }
        Ok(outcome)
    }

    fn record_vote(
        &self,
        id: &ProposalId,
        identity: &Identity,
        voted: bool,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existing = self.read_entry(&wtxn, id)?;
        let (merged, outcome) = merge_vote(existing, *identity, voted);
        if let (Some(entry), true) = (merged, outcome.needs_write()) {
            self.write_entry(&mut wtxn, id, &entry)?;
            wtxn.commit().map_err(LmdbError::from)?;
        }
        Ok(outcome)
    }
}
