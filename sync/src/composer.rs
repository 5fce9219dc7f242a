//! Response Composer and the Pending-state correction.

use std::collections::{BTreeMap, HashMap};

use govsync_ledger::ReadResults;
use govsync_store::CacheEntry;
use govsync_types::{Identity, ProposalId, ProposalState};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

/// One proposal as returned to a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProposalStatus {
    pub state: ProposalState,
    /// The caller's vote flag; `None` when it has never been read.
    pub has_voted: Option<bool>,
}

/// Composed result of one sync pass, ordered by proposal id.
///
/// Serializes as `{"<id>": {"state": n, "hasVoted": bool|null}}`. The
/// `hasVoted` field is only present when the pass was made for an identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProposalStates {
    with_votes: bool,
    entries: BTreeMap<ProposalId, ProposalStatus>,
}

impl ProposalStates {
    pub fn get(&self, id: &ProposalId) -> Option<&ProposalStatus> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ProposalId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProposalId, &ProposalStatus)> {
        self.entries.iter()
    }

    /// Ids whose composed state is `Pending`.
    pub fn pending_ids(&self) -> Vec<ProposalId> {
        self.entries
            .iter()
            .filter(|(_, status)| status.state == ProposalState::Pending)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Overwrite composed states with successful correction reads.
    ///
    /// Failed reads keep the pre-correction value. Returns how many states
    /// changed.
    pub fn apply_correction(&mut self, fresh: &ReadResults<ProposalState>) -> usize {
        let mut changed = 0;
        for (id, read) in fresh {
            if let (Ok(state), Some(status)) = (read, self.entries.get_mut(id)) {
                if status.state != *state {
                    status.state = *state;
                    changed += 1;
                }
            }
        }
        changed
    }
}

/// Build the caller's view of `ids` from a cache snapshot.
///
/// Ids with no cache entry are omitted: there is nothing observed to show.
pub fn compose(
    ids: &[ProposalId],
    cache: &HashMap<ProposalId, CacheEntry>,
    identity: Option<&Identity>,
) -> ProposalStates {
    let entries = ids
        .iter()
        .filter_map(|id| {
            let entry = cache.get(id)?;
            let status = ProposalStatus {
                state: entry.state,
                has_voted: identity.and_then(|identity| entry.has_voted(identity)),
            };
            Some((*id, status))
        })
        .collect();

    ProposalStates {
        with_votes: identity.is_some(),
        entries,
    }
}

struct StatusView<'a> {
    status: &'a ProposalStatus,
    with_votes: bool,
}

impl Serialize for StatusView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.with_votes { 2 } else { 1 };
        let mut s = serializer.serialize_struct("ProposalStatus", fields)?;
        s.serialize_field("state", &self.status.state)?;
        if self.with_votes {
            s.serialize_field("hasVoted", &self.status.has_voted)?;
        }
        s.end()
    }
}

impl Serialize for ProposalStates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, status) in &self.entries {
            map.serialize_entry(
                &id.to_string(),
                &StatusView {
                    status,
                    with_votes: self.with_votes,
                },
            )?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govsync_ledger::{LedgerError, ReadError};
    use govsync_types::{Address, Timestamp};
    use serde_json::json;

    fn id(v: u64) -> ProposalId {
        ProposalId::from_u64(v)
    }

    fn voter() -> Identity {
        Identity::new(Address::new([0x0b; 20]))
    }

    fn cache(entries: &[(u64, ProposalState)]) -> HashMap<ProposalId, CacheEntry> {
        entries
            .iter()
            .map(|(v, s)| (id(*v), CacheEntry::new(*s, Timestamp::from_secs(1))))
            .collect()
    }

    #[test]
    fn composes_cached_states_in_id_order() {
        let cache = cache(&[(3, ProposalState::Executed), (1, ProposalState::Active)]);
        let states = compose(&[id(3), id(1)], &cache, None);

        let ids: Vec<_> = states.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![id(1), id(3)]);
        assert_eq!(states.get(&id(3)).unwrap().state, ProposalState::Executed);
    }

    #[test]
    fn never_observed_ids_are_omitted() {
        let cache = cache(&[(1, ProposalState::Active)]);
        let states = compose(&[id(1), id(2)], &cache, None);
        assert!(states.contains(&id(1)));
        assert!(!states.contains(&id(2)));
    }

    #[test]
    fn unknown_vote_is_distinct_from_false() {
        let mut cache = cache(&[(1, ProposalState::Active), (2, ProposalState::Active)]);
        cache.get_mut(&id(1)).unwrap().record_vote(voter(), false);

        let states = compose(&[id(1), id(2)], &cache, Some(&voter()));
        assert_eq!(states.get(&id(1)).unwrap().has_voted, Some(false));
        assert_eq!(states.get(&id(2)).unwrap().has_voted, None);
    }

    #[test]
    fn correction_overwrites_only_successful_reads() {
        let cache = cache(&[(1, ProposalState::Pending), (2, ProposalState::Pending)]);
        let mut states = compose(&[id(1), id(2)], &cache, None);
        assert_eq!(states.pending_ids(), vec![id(1), id(2)]);

        let mut fresh = HashMap::new();
        fresh.insert(id(1), Ok(ProposalState::Active));
        fresh.insert(
            id(2),
            Err(ReadError::BatchUnavailable(LedgerError::Unreachable("down".into()))),
        );

        assert_eq!(states.apply_correction(&fresh), 1);
        assert_eq!(states.get(&id(1)).unwrap().state, ProposalState::Active);
        assert_eq!(states.get(&id(2)).unwrap().state, ProposalState::Pending);
    }

    #[test]
    fn serializes_without_votes() {
        let cache = cache(&[(1, ProposalState::Active)]);
        let states = compose(&[id(1)], &cache, None);
        assert_eq!(serde_json::to_value(&states).unwrap(), json!({"1": {"state": 1}}));
    }

    #[test]
    fn serializes_vote_overlay_with_null_for_unknown() {
        let mut cache = cache(&[(1, ProposalState::Active), (2, ProposalState::Defeated)]);
        cache.get_mut(&id(1)).unwrap().record_vote(voter(), true);

        let states = compose(&[id(1), id(2)], &cache, Some(&voter()));
        assert_eq!(
            serde_json::to_value(&states).unwrap(),
            json!({
                "1": {"state": 1, "hasVoted": true},
                "2": {"state": 3, "hasVoted": null},
            })
        );
    }
}
