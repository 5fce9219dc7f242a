//! Batched, typed reads of Governor state.
//!
//! Every read for one sync pass goes out as a single batch, so the fixed
//! per-round-trip cost is paid once for all N proposals. Failures never
//! escape as errors: each proposal gets its own `Result`, and a batch that
//! fails or times out as a whole marks every proposal in it as failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use govsync_types::{Address, Identity, ProposalId, ProposalState};

use crate::abi::{decode_bool, decode_state};
use crate::{CallOutcome, LedgerCall, LedgerClient, ReadError};

/// Per-proposal outcome of one batched read.
pub type ReadResults<T> = HashMap<ProposalId, Result<T, ReadError>>;

/// Reads proposal states and vote flags from one Governor contract.
pub struct BatchedLedgerReader<L> {
    client: Arc<L>,
    governor: Address,
    timeout: Duration,
}

impl<L> Clone for BatchedLedgerReader<L> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            governor: self.governor,
            timeout: self.timeout,
        }
    }
}

impl<L: LedgerClient> BatchedLedgerReader<L> {
    pub fn new(client: Arc<L>, governor: Address, timeout: Duration) -> Self {
        Self {
            client,
            governor,
            timeout,
        }
    }

    pub fn client(&self) -> &Arc<L> {
        &self.client
    }

    /// `state(id)` for every id, in one batch.
    pub async fn read_states(&self, ids: &[ProposalId]) -> ReadResults<ProposalState> {
        let calls = ids
            .iter()
            .map(|id| LedgerCall::state(self.governor, *id))
            .collect();
        self.run_batch(ids, calls, decode_state).await
    }

    /// `hasVoted(id, identity)` for every id, in one batch.
    pub async fn read_vote_flags(&self, ids: &[ProposalId], identity: &Identity) -> ReadResults<bool> {
        let voter = *identity.address();
        let calls = ids
            .iter()
            .map(|id| LedgerCall::has_voted(self.governor, *id, voter))
            .collect();
        self.run_batch(ids, calls, decode_bool).await
    }

    async fn run_batch<T>(
        &self,
        ids: &[ProposalId],
        calls: Vec<LedgerCall>,
        decode: fn(&[u8]) -> Result<T, String>,
    ) -> ReadResults<T> {
        if ids.is_empty() {
            return HashMap::new();
        }

        let outcomes =
            match tokio::time::timeout(self.timeout, self.client.batch_read(&calls)).await {
                Ok(Ok(outcomes)) if outcomes.len() == ids.len() => outcomes,
                Ok(Ok(outcomes)) => {
                    let err = crate::LedgerError::ResultCountMismatch {
                        expected: ids.len(),
                        got: outcomes.len(),
                    };
                    tracing::warn!(error = %err, "ledger batch broke positional contract");
                    return fail_all(ids, ReadError::BatchUnavailable(err));
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, calls = ids.len(), "ledger batch unavailable");
                    return fail_all(ids, ReadError::BatchUnavailable(err));
                }
                Err(_) => {
                    tracing::warn!(timeout = ?self.timeout, calls = ids.len(), "ledger batch timed out");
                    return fail_all(ids, ReadError::TimedOut(self.timeout));
                }
            };

        ids.iter()
            .zip(outcomes)
            .map(|(id, outcome)| (*id, decode_outcome(*id, outcome, decode)))
            .collect()
    }
}

fn decode_outcome<T>(
    id: ProposalId,
    outcome: CallOutcome,
    decode: fn(&[u8]) -> Result<T, String>,
) -> Result<T, ReadError> {
    let data = outcome.map_err(|source| {
        tracing::debug!(proposal = %id, error = %source, "ledger call failed");
        ReadError::Call { id, source }
    })?;
    decode(&data).map_err(|reason| {
        tracing::debug!(proposal = %id, %reason, "undecodable ledger return data");
        ReadError::Decode { id, reason }
    })
}

fn fail_all<T>(ids: &[ProposalId], err: ReadError) -> ReadResults<T> {
    ids.iter().map(|id| (*id, Err(err.clone()))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{encode_bool, encode_state};
    use crate::{CallArg, CallError, LedgerError, LedgerMethod};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every call from a fixed table; records each batch it sees.
    struct TableLedger {
        states: HashMap<ProposalId, ProposalState>,
        fail_batch: bool,
        delay: Option<Duration>,
        batches: Mutex<Vec<Vec<LedgerCall>>>,
    }

    impl TableLedger {
        fn new(states: &[(u64, ProposalState)]) -> Self {
            Self {
                states: states
                    .iter()
                    .map(|(id, s)| (ProposalId::from_u64(*id), *s))
                    .collect(),
                fail_batch: false,
                delay: None,
                batches: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerClient for TableLedger {
        async fn batch_read(&self, calls: &[LedgerCall]) -> Result<Vec<CallOutcome>, LedgerError> {
            self.batches.lock().unwrap().push(calls.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_batch {
                return Err(LedgerError::Unreachable("connection refused".into()));
            }
            Ok(calls
                .iter()
                .map(|call| {
                    let id = call.proposal_id().expect("id arg");
                    match (call.method, self.states.get(&id)) {
                        (LedgerMethod::State, Some(state)) => Ok(encode_state(*state)),
                        (LedgerMethod::HasVoted, Some(_)) => {
                            let voted = matches!(call.args[1], CallArg::Address(a) if a.as_bytes()[0] == 0xaa);
                            Ok(encode_bool(voted))
                        }
                        (_, None) => Err(CallError::Reverted("unknown proposal id".into())),
                    }
                })
                .collect())
        }
    }

    fn governor() -> Address {
        Address::new([0x11; 20])
    }

    fn reader(ledger: TableLedger) -> BatchedLedgerReader<TableLedger> {
        BatchedLedgerReader::new(Arc::new(ledger), governor(), Duration::from_millis(200))
    }

    fn ids(values: &[u64]) -> Vec<ProposalId> {
        values.iter().copied().map(ProposalId::from_u64).collect()
    }

    #[tokio::test]
    async fn reads_all_states_in_one_batch() {
        let reader = reader(TableLedger::new(&[
            (1, ProposalState::Active),
            (2, ProposalState::Pending),
            (3, ProposalState::Executed),
        ]));

        let results = reader.read_states(&ids(&[1, 2, 3])).await;

        assert_eq!(reader.client().batches.lock().unwrap().len(), 1);
        assert_eq!(results.len(), 3);
        assert_eq!(
            *results[&ProposalId::from_u64(2)].as_ref().unwrap(),
            ProposalState::Pending
        );
    }

    #[tokio::test]
    async fn one_failing_call_does_not_fail_the_others() {
        let reader = reader(TableLedger::new(&[(1, ProposalState::Active), (3, ProposalState::Queued)]));

        let results = reader.read_states(&ids(&[1, 2, 3])).await;

        assert!(results[&ProposalId::from_u64(1)].is_ok());
        assert!(matches!(
            results[&ProposalId::from_u64(2)],
            Err(ReadError::Call { source: CallError::Reverted(_), .. })
        ));
        assert!(results[&ProposalId::from_u64(3)].is_ok());
    }

    #[tokio::test]
    async fn batch_failure_marks_every_id() {
        let mut ledger = TableLedger::new(&[(1, ProposalState::Active)]);
        ledger.fail_batch = true;
        let reader = reader(ledger);

        let results = reader.read_states(&ids(&[1, 2])).await;

        assert_eq!(results.len(), 2);
        assert!(results.values().all(|r| matches!(r, Err(e) if e.is_batch_failure())));
    }

    #[tokio::test]
    async fn slow_batch_times_out() {
        let mut ledger = TableLedger::new(&[(1, ProposalState::Active)]);
        ledger.delay = Some(Duration::from_secs(5));
        let reader = reader(ledger);

        let results = reader.read_states(&ids(&[1])).await;

        assert!(matches!(
            results[&ProposalId::from_u64(1)],
            Err(ReadError::TimedOut(_))
        ));
    }

    #[tokio::test]
    async fn empty_input_issues_no_batch() {
        let reader = reader(TableLedger::new(&[]));
        assert!(reader.read_states(&[]).await.is_empty());
        assert!(reader.client().batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn vote_flags_are_read_for_the_identity() {
        let reader = reader(TableLedger::new(&[(1, ProposalState::Active), (2, ProposalState::Active)]));
        let voter = Identity::new(Address::new([0xaa; 20]));
        let other = Identity::new(Address::new([0xbb; 20]));

        let voted = reader.read_vote_flags(&ids(&[1, 2]), &voter).await;
        let not_voted = reader.read_vote_flags(&ids(&[1]), &other).await;

        assert!(*voted[&ProposalId::from_u64(1)].as_ref().unwrap());
        assert!(!*not_voted[&ProposalId::from_u64(1)].as_ref().unwrap());

        let batches = reader.client().batches.lock().unwrap();
        assert!(batches[0].iter().all(|c| c.method == LedgerMethod::HasVoted));
        assert!(batches[0].iter().all(|c| c.contract == governor()));
    }
}
