//! Staleness evaluation: which proposals need a fresh ledger read.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use govsync_store::CacheEntry;
use govsync_types::{Identity, ProposalId, Timestamp};

/// Select the ids whose cached state must be re-read.
///
/// An id is selected when `force` is set, when it has no cache entry, or when
/// its entry is older than `ttl` at `now`. An entry exactly `ttl` old is
/// still fresh.
pub fn select_stale(
    ids: &[ProposalId],
    cache: &HashMap<ProposalId, CacheEntry>,
    ttl: Duration,
    force: bool,
    now: Timestamp,
) -> Vec<ProposalId> {
    ids.iter()
        .filter(|id| {
            force
                || match cache.get(id) {
                    None => true,
                    Some(entry) => entry.last_checked.elapsed_since(now) > ttl,
                }
        })
        .copied()
        .collect()
}

/// Select the ids whose vote flag for `identity` should be read this pass.
///
/// Every stale id is re-read, plus any cached id that has never been read
/// for this identity, so a first-time caller gets its flags without forcing
/// a state refresh.
pub fn select_vote_refresh(
    ids: &[ProposalId],
    cache: &HashMap<ProposalId, CacheEntry>,
    stale: &[ProposalId],
    identity: &Identity,
) -> Vec<ProposalId> {
    let stale: HashSet<&ProposalId> = stale.iter().collect();
    ids.iter()
        .filter(|id| {
            stale.contains(id)
                || cache
                    .get(id)
                    .is_some_and(|entry| entry.has_voted(identity).is_none())
        })
        .copied()
        .collect()
}
