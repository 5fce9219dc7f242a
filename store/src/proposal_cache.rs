//! Proposal-state cache table and its merge rules.
//!
//! Backends never overwrite an entry blindly. They load the current entry,
//! run it through [`merge_state`] / [`merge_vote`] and write the result back
//! inside one atomic unit (an LMDB write transaction, a mutex section), which
//! gives compare-and-set semantics without any caller-side locking.

use std::collections::{BTreeMap, HashMap};

use govsync_types::{Identity, ProposalId, ProposalState, Timestamp};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Cached ledger observation for one proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Last state successfully read from the ledger.
    pub state: ProposalState,
    /// When that read happened.
    pub last_checked: Timestamp,
    /// Per-identity "has voted" flags. Identities never queried are absent.
    pub user_votes: BTreeMap<Identity, bool>,
}

impl CacheEntry {
    pub fn new(state: ProposalState, checked_at: Timestamp) -> Self {
        Self {
            state,
            last_checked: checked_at,
            user_votes: BTreeMap::new(),
        }
    }

    /// Apply a state read taken at `checked_at`. Returns whether the entry changed.
    ///
    /// The later read wins. Reads stamped with the same instant are ordered by
    /// lifecycle position, so applying any set of reads in any order converges.
    pub fn apply_state(&mut self, state: ProposalState, checked_at: Timestamp) -> bool {
        let newer = checked_at > self.last_checked;
        let same_instant_further_along = checked_at == self.last_checked
            && (state.rank(), state.code()) > (self.state.rank(), self.state.code());

        if newer || same_instant_further_along {
            self.state = state;
            self.last_checked = checked_at;
            true
        } else {
            false
        }
    }

    /// Record a "has voted" read for `identity`. Returns whether the entry changed.
    ///
    /// `true` is sticky: the ledger does not allow un-voting, so a later
    /// `false` is a read-path inconsistency and is ignored.
    pub fn record_vote(&mut self, identity: Identity, voted: bool) -> bool {
        match self.user_votes.get(&identity) {
            Some(true) => false,
            Some(false) if !voted => false,
            _ => {
                self.user_votes.insert(identity, voted);
                true
            }
        }
    }

    /// The recorded flag for `identity`, `None` when never read.
    pub fn has_voted(&self, identity: &Identity) -> Option<bool> {
        self.user_votes.get(identity).copied()
    }
}

/// What an upsert did to the stored entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No entry existed; one was created.
    Inserted,
    /// The existing entry changed.
    Updated,
    /// The write lost to a newer (or equal) value already stored.
    Unchanged,
    /// Nothing to attach the value to (vote flag for an unseen proposal).
    NoEntry,
}

impl UpsertOutcome {
    /// Whether the backend has to persist the merged entry.
    pub fn needs_write(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}

/// Merge a state read into the stored entry (if any).
pub fn merge_state(
    existing: Option<CacheEntry>,
    state: ProposalState,
    checked_at: Timestamp,
) -> (CacheEntry, UpsertOutcome) {
    match existing {
        None => (CacheEntry::new(state, checked_at), UpsertOutcome::Inserted),
        Some(mut entry) => {
            let outcome = if entry.apply_state(state, checked_at) {
                UpsertOutcome::Updated
            } else {
                UpsertOutcome::Unchanged
            };
            (entry, outcome)
        }
    }
}

/// Merge a vote-flag read into the stored entry.
///
/// An entry is never fabricated for a proposal whose state was never read.
pub fn merge_vote(
    existing: Option<CacheEntry>,
    identity: Identity,
    voted: bool,
) -> (Option<CacheEntry>, UpsertOutcome) {
    match existing {
        None => (None, UpsertOutcome::NoEntry),
        Some(mut entry) => {
            let outcome = if entry.record_vote(identity, voted) {
                UpsertOutcome::Updated
            } else {
                UpsertOutcome::Unchanged
            };
            (Some(entry), outcome)
        }
    }
}

/// Trait for the proposal-state cache table (`proposal_id` primary key).
pub trait ProposalCacheStore {
    /// Point read of one entry.
    fn get_entry(&self, id: &ProposalId) -> Result<Option<CacheEntry>, StoreError>;

    /// Every cached entry.
    fn load_entries(&self) -> Result<HashMap<ProposalId, CacheEntry>, StoreError>;

    /// Compare-and-set a fresh state read (see [`merge_state`]).
    fn upsert_state(
        &self,
        id: &ProposalId,
        state: ProposalState,
        checked_at: Timestamp,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Compare-and-set a fresh vote-flag read (see [`merge_vote`]).
    fn record_vote(
        &self,
        id: &ProposalId,
        identity: &Identity,
        voted: bool,
    ) -> Result<UpsertOutcome, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use govsync_types::Address;
    use proptest::prelude::*;

    fn identity(seed: u8) -> Identity {
        Identity::new(Address::new([seed; 20]))
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    #[test]
    fn newer_read_wins() {
        let mut entry = CacheEntry::new(ProposalState::Pending, ts(1));
        assert!(entry.apply_state(ProposalState::Active, ts(2)));
        assert_eq!(entry.state, ProposalState::Active);
        assert_eq!(entry.last_checked, ts(2));
    }

    #[test]
    fn older_read_is_ignored() {
        let mut entry = CacheEntry::new(ProposalState::Active, ts(5));
        assert!(!entry.apply_state(ProposalState::Pending, ts(4)));
        assert_eq!(entry.state, ProposalState::Active);
        assert_eq!(entry.last_checked, ts(5));
    }

    #[test]
    fn same_read_twice_is_idempotent() {
        let (first, outcome) = merge_state(None, ProposalState::Active, ts(3));
        assert_eq!(outcome, UpsertOutcome::Inserted);
        let (second, outcome) = merge_state(Some(first.clone()), ProposalState::Active, ts(3));
        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert_eq!(first, second);
    }

    #[test]
    fn same_instant_prefers_later_lifecycle_state() {
        let mut entry = CacheEntry::new(ProposalState::Pending, ts(3));
        assert!(entry.apply_state(ProposalState::Active, ts(3)));
        assert!(!entry.apply_state(ProposalState::Pending, ts(3)));
        assert_eq!(entry.state, ProposalState::Active);
    }

    #[test]
    fn refresh_with_same_state_bumps_last_checked() {
        let (entry, _) = merge_state(None, ProposalState::Active, ts(1));
        let (entry, outcome) = merge_state(Some(entry), ProposalState::Active, ts(9));
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(entry.last_checked, ts(9));
    }

    #[test]
    fn true_vote_is_sticky() {
        let mut entry = CacheEntry::new(ProposalState::Active, ts(1));
        let voter = identity(1);
        assert!(entry.record_vote(voter, true));
        assert!(!entry.record_vote(voter, false));
        assert_eq!(entry.has_voted(&voter), Some(true));
    }

    #[test]
    fn false_vote_upgrades_to_true() {
        let mut entry = CacheEntry::new(ProposalState::Active, ts(1));
        let voter = identity(2);
        assert!(entry.record_vote(voter, false));
        assert_eq!(entry.has_voted(&voter), Some(false));
        assert!(entry.record_vote(voter, true));
        assert_eq!(entry.has_voted(&voter), Some(true));
    }

    #[test]
    fn unqueried_identity_is_absent() {
        let mut entry = CacheEntry::new(ProposalState::Active, ts(1));
        entry.record_vote(identity(1), false);
        assert_eq!(entry.has_voted(&identity(9)), None);
    }

    #[test]
    fn vote_without_entry_is_not_fabricated() {
        let (entry, outcome) = merge_vote(None, identity(1), true);
        assert!(entry.is_none());
        assert_eq!(outcome, UpsertOutcome::NoEntry);
        assert!(!outcome.needs_write());
    }

    fn any_state() -> impl Strategy<Value = ProposalState> {
        (0u8..8).prop_map(|c| ProposalState::from_code(c).unwrap())
    }

    proptest! {
        /// Applying two reads in either order yields the same entry.
        #[test]
        fn state_merge_commutes(
            a in any_state(), ta in 0u64..100,
            b in any_state(), tb in 0u64..100,
        ) {
            let base = CacheEntry::new(ProposalState::Pending, Timestamp::EPOCH);

            let mut ab = base.clone();
            ab.apply_state(a, Timestamp::from_millis(ta));
            ab.apply_state(b, Timestamp::from_millis(tb));

            let mut ba = base;
            ba.apply_state(b, Timestamp::from_millis(tb));
            ba.apply_state(a, Timestamp::from_millis(ta));

            prop_assert_eq!(ab, ba);
        }

        /// last_checked never decreases.
        #[test]
        fn last_checked_is_monotonic(reads in prop::collection::vec((any_state(), 0u64..1000), 1..20)) {
            let mut entry = CacheEntry::new(ProposalState::Pending, Timestamp::EPOCH);
            let mut high = Timestamp::EPOCH;
            for (state, t) in reads {
                entry.apply_state(state, Timestamp::from_millis(t));
                prop_assert!(entry.last_checked >= high);
                high = entry.last_checked;
            }
        }

        /// Once true, a vote flag stays true whatever is read afterwards.
        #[test]
        fn vote_flags_are_monotonic(reads in prop::collection::vec(any::<bool>(), 1..20)) {
            let mut entry = CacheEntry::new(ProposalState::Active, Timestamp::EPOCH);
            let voter = identity(7);
            let mut seen_true = false;
            for voted in reads {
                entry.record_vote(voter, voted);
                seen_true |= voted;
                if seen_true {
                    prop_assert_eq!(entry.has_voted(&voter), Some(true));
                }
            }
        }
    }
}
