//! Cache Writer: folds a pass's ledger reads into the cache table.

use govsync_ledger::ReadResults;
use govsync_store::{ProposalCacheStore, StoreError, UpsertOutcome};
use govsync_types::{Identity, ProposalState, Timestamp};
use tracing::debug;

/// Counts of what one commit did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// State reads that inserted or changed an entry.
    pub states_written: usize,
    /// State reads that lost to an equal or newer stored value.
    pub states_unchanged: usize,
    /// Vote-flag reads that changed an entry.
    pub votes_written: usize,
    /// Vote-flag reads with no entry to attach to.
    pub votes_skipped: usize,
    /// Failed reads of either kind; their entries were left untouched.
    pub reads_failed: usize,
}

impl CommitReport {
    pub fn upserts(&self) -> usize {
        self.states_written + self.votes_written
    }
}

/// Writes fresh reads through the store's compare-and-set upserts.
pub struct CacheWriter<'a, C: ?Sized> {
    cache: &'a C,
}

impl<'a, C: ProposalCacheStore + ?Sized> CacheWriter<'a, C> {
    pub fn new(cache: &'a C) -> Self {
        Self { cache }
    }

    /// Commit state reads stamped `now`, then vote-flag reads for `identity`.
    ///
    /// States go first so a proposal seen for the first time this pass can
    /// carry its vote flag. Vote reads are ignored without an identity.
    pub fn commit(
        &self,
        fresh: &ReadResults<ProposalState>,
        identity: Option<&Identity>,
        vote_fresh: &ReadResults<bool>,
        now: Timestamp,
    ) -> Result<CommitReport, StoreError> {
        let mut report = self.commit_states(fresh, now)?;

        let Some(identity) = identity else {
            return Ok(report);
        };
        for (id, read) in vote_fresh {
            let voted = match read {
                Ok(voted) => *voted,
                Err(_) => {
                    report.reads_failed += 1;
                    continue;
                }
            };
            match self.cache.record_vote(id, identity, voted)? {
                UpsertOutcome::NoEntry => {
                    debug!(proposal = %id, "vote flag without cache entry skipped");
                    report.votes_skipped += 1;
                }
                outcome if outcome.needs_write() => report.votes_written += 1,
                _ => {}
            }
        }
        Ok(report)
    }

    /// Commit state reads only.
    pub fn commit_states(
        &self,
        fresh: &ReadResults<ProposalState>,
        now: Timestamp,
    ) -> Result<CommitReport, StoreError> {
        let mut report = CommitReport::default();
        for (id, read) in fresh {
            let Ok(state) = read else {
                report.reads_failed += 1;
                continue;
            };
            if self.cache.upsert_state(id, *state, now)?.needs_write() {
                report.states_written += 1;
            } else {
                report.states_unchanged += 1;
            }
        }
        Ok(report)
    }
}
