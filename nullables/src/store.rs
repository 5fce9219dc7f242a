//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use govsync_store::proposal_cache::{merge_state, merge_vote};
use govsync_store::{CacheEntry, ProposalCacheStore, ProposalDirectory, StoreError, UpsertOutcome};
use govsync_types::{Identity, ProposalId, ProposalState, Timestamp};

/// An in-memory proposal directory + cache table for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// Each upsert runs its merge inside the table mutex, which gives the same
/// compare-and-set behaviour as the LMDB write transaction.
pub struct NullStore {
    directory: Mutex<BTreeSet<ProposalId>>,
    entries: Mutex<HashMap<ProposalId, CacheEntry>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            directory: Mutex::new(BTreeSet::new()),
            entries: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// A store whose directory already lists `ids`.
    pub fn with_proposals(ids: &[u64]) -> Self {
        let store = Self::new();
        for id in ids {
            store.register(ProposalId::from_u64(*id));
        }
        store
    }

    /// Add a proposal to the directory.
    pub fn register(&self, id: ProposalId) {
        self.directory.lock().unwrap().insert(id);
    }

    /// Seed a cache entry directly, bypassing the merge rules.
    pub fn insert_entry(&self, id: ProposalId, entry: CacheEntry) {
        self.entries.lock().unwrap().insert(id, entry);
    }

    /// Current cache entry (for assertions).
    pub fn entry(&self, id: &ProposalId) -> Option<CacheEntry> {
        self.entries.lock().unwrap().get(id).cloned()
    }

    /// Make every call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of upserts that changed an entry.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("null store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn record_write(&self, outcome: UpsertOutcome) -> UpsertOutcome {
        if outcome.needs_write() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        outcome
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProposalDirectory for NullStore {
    fn list_known_proposal_ids(&self) -> Result<Vec<ProposalId>, StoreError> {
        self.check()?;
        Ok(self.directory.lock().unwrap().iter().copied().collect())
    }
}

impl ProposalCacheStore for NullStore {
    fn get_entry(&self, id: &ProposalId) -> Result<Option<CacheEntry>, StoreError> {
        self.check()?;
        Ok(self.entry(id))
    }

    fn load_entries(&self) -> Result<HashMap<ProposalId, CacheEntry>, StoreError> {
        self.check()?;
        Ok(self.entries.lock().unwrap().clone())
    }

    fn upsert_state(
        &self,
        id: &ProposalId,
        state: ProposalState,
        checked_at: Timestamp,
    ) -> Result<UpsertOutcome, StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        let (entry, outcome) = merge_state(entries.get(id).cloned(), state, checked_at);
        if outcome.needs_write() {
            entries.insert(*id, entry);
        }
        Ok(self.record_write(outcome))
    }

    fn record_vote(
        &self,
        id: &ProposalId,
        identity: &Identity,
        voted: bool,
    ) -> Result<UpsertOutcome, StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        let (entry, outcome) = merge_vote(entries.get(id).cloned(), *identity, voted);
        if let (Some(entry), true) = (entry, outcome.needs_write()) {
            entries.insert(*id, entry);
        }
        Ok(self.record_write(outcome))
    }
}
