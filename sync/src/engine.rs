//! One synchronization pass, end to end.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use govsync_ledger::{BatchedLedgerReader, LedgerClient, ReadResults};
use govsync_store::{ProposalCacheStore, ProposalDirectory};
use govsync_types::{Clock, Identity};
use tracing::{debug, field, info_span, warn, Instrument};

use crate::composer::{compose, ProposalStates};
use crate::staleness::{select_stale, select_vote_refresh};
use crate::writer::{CacheWriter, CommitReport};
use crate::{SyncError, SyncMetrics};

/// Parameters of one inbound query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncRequest {
    /// Caller whose vote flags should be overlaid on the result.
    pub identity: Option<Identity>,
    /// Re-read every known proposal regardless of cache age.
    pub force: bool,
}

impl SyncRequest {
    pub fn new(identity: Option<Identity>, force: bool) -> Self {
        Self { identity, force }
    }
}

/// The read-through cache in front of the Governor contract.
///
/// Holds no mutable state of its own; any number of passes may run on one
/// instance concurrently.
pub struct ProposalSync<D, C, L> {
    directory: Arc<D>,
    cache: Arc<C>,
    reader: BatchedLedgerReader<L>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    metrics: Option<Arc<SyncMetrics>>,
}

impl<D, C, L> ProposalSync<D, C, L>
where
    D: ProposalDirectory + Send + Sync,
    C: ProposalCacheStore + Send + Sync,
    L: LedgerClient,
{
    pub fn new(
        directory: Arc<D>,
        cache: Arc<C>,
        reader: BatchedLedgerReader<L>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            directory,
            cache,
            reader,
            clock,
            ttl,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn metrics(&self) -> Option<&Arc<SyncMetrics>> {
        self.metrics.as_ref()
    }

    /// Run one pass and return the composed states of every known proposal.
    ///
    /// Only store failures are returned as errors. Ledger failures fall back
    /// to the last cached value, and a proposal that was never observed is
    /// left out of the result.
    pub async fn sync(&self, request: SyncRequest) -> Result<ProposalStates, SyncError> {
        let span = info_span!(
            "proposal_sync",
            force = request.force,
            identity = field::Empty
        );
        if let Some(identity) = &request.identity {
            span.record("identity", field::display(identity));
        }

        let started = Instant::now();
        let result = self.run_pass(request).instrument(span).await;
        if let Some(metrics) = &self.metrics {
            metrics.passes.inc();
            metrics
                .pass_duration_ms
                .observe(started.elapsed().as_secs_f64() * 1000.0);
        }
        result
    }

    async fn run_pass(&self, request: SyncRequest) -> Result<ProposalStates, SyncError> {
        let identity = request.identity.as_ref();

        let ids = self.directory.list_known_proposal_ids()?;
        let mut snapshot = self.cache.load_entries()?;
        let now = self.clock.now();

        let stale = select_stale(&ids, &snapshot, self.ttl, request.force, now);
        let vote_ids = match identity {
            Some(identity) => select_vote_refresh(&ids, &snapshot, &stale, identity),
            None => Vec::new(),
        };
        debug!(
            known = ids.len(),
            cached = snapshot.len(),
            stale = stale.len(),
            vote_reads = vote_ids.len(),
            "staleness evaluated"
        );
        self.count(|m| m.stale_selected.inc_by(stale.len() as u64));

        if !stale.is_empty() || !vote_ids.is_empty() {
            let (states, votes) = tokio::join!(self.reader.read_states(&stale), async {
                match identity {
                    Some(identity) => self.reader.read_vote_flags(&vote_ids, identity).await,
                    None => HashMap::new(),
                }
            });
            self.observe_batch(&states);
            self.observe_batch(&votes);

            let report = CacheWriter::new(&*self.cache).commit(&states, identity, &votes, now)?;
            self.observe_commit(&report);

            // Re-read what was touched so overlapping passes are reflected.
            let touched: BTreeSet<_> = stale.iter().chain(vote_ids.iter()).copied().collect();
            for id in touched {
                if let Some(entry) = self.cache.get_entry(&id)? {
                    snapshot.insert(id, entry);
                }
            }
        }

        let mut composed = compose(&ids, &snapshot, identity);

        let pending = composed.pending_ids();
        if !pending.is_empty() {
            self.count(|m| m.pending_corrections.inc_by(pending.len() as u64));
            let corrected_at = self.clock.now();
            let fresh = self.reader.read_states(&pending).await;
            self.observe_batch(&fresh);

            let report = CacheWriter::new(&*self.cache).commit_states(&fresh, corrected_at)?;
            self.observe_commit(&report);
            let changed = composed.apply_correction(&fresh);
            debug!(pending = pending.len(), changed, "pending states corrected");
        }

        Ok(composed)
    }

    fn count(&self, f: impl FnOnce(&SyncMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }

    fn observe_batch<T>(&self, results: &ReadResults<T>) {
        if results.is_empty() {
            return;
        }
        let failed = results.values().filter(|r| r.is_err()).count();
        let batch_failed = results
            .values()
            .any(|r| matches!(r, Err(e) if e.is_batch_failure()));
        if batch_failed {
            warn!(ids = results.len(), "ledger batch failed, serving cached values");
        } else if failed > 0 {
            debug!(failed, of = results.len(), "some ledger reads failed");
        }
        self.count(|m| {
            m.ledger_batches.inc();
            if batch_failed {
                m.batch_failures.inc();
            } else {
                m.call_failures.inc_by(failed as u64);
            }
        });
    }

    fn observe_commit(&self, report: &CommitReport) {
        debug!(
            written = report.states_written,
            unchanged = report.states_unchanged,
            votes = report.votes_written,
            skipped = report.votes_skipped,
            failed = report.reads_failed,
            "cache commit"
        );
        self.count(|m| m.cache_upserts.inc_by(report.upserts() as u64));
    }
}
