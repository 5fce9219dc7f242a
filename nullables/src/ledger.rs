//! Nullable ledger: a scripted Governor that records every batch.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use govsync_ledger::abi::{encode_bool, encode_state};
use govsync_ledger::{
    CallArg, CallError, CallOutcome, LedgerCall, LedgerClient, LedgerError, LedgerMethod,
};
use govsync_types::{Address, Identity, ProposalId, ProposalState};

/// A test ledger answering `state` / `hasVoted` from in-memory tables.
///
/// - Unknown proposal ids revert, like the real contract.
/// - `hasVoted` defaults to `false` for known proposals.
/// - Queued states are handed out one per read; the last one sticks.
pub struct NullLedger {
    states: Mutex<HashMap<ProposalId, VecDeque<ProposalState>>>,
    votes: Mutex<HashMap<(ProposalId, Address), bool>>,
    failing: Mutex<HashSet<(LedgerMethod, ProposalId)>>,
    unavailable: AtomicBool,
    delay: Mutex<Option<Duration>>,
    batches: Mutex<Vec<Vec<LedgerCall>>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            votes: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
            delay: Mutex::new(None),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Report `state` for `id` from now on.
    pub fn set_state(&self, id: ProposalId, state: ProposalState) {
        self.states
            .lock()
            .unwrap()
            .insert(id, VecDeque::from([state]));
    }

    /// Report `states` for `id` on successive reads.
    pub fn queue_states(&self, id: ProposalId, states: &[ProposalState]) {
        self.states
            .lock()
            .unwrap()
            .insert(id, states.iter().copied().collect());
    }

    pub fn set_vote(&self, id: ProposalId, voter: &Identity, voted: bool) {
        self.votes
            .lock()
            .unwrap()
            .insert((id, *voter.address()), voted);
    }

    /// Make one kind of call for `id` fail with an RPC error.
    pub fn fail_call(&self, method: LedgerMethod, id: ProposalId) {
        self.failing.lock().unwrap().insert((method, id));
    }

    /// Fail every batch as if the endpoint were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Hold every batch for `delay` before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Every batch received, in order (for assertions).
    pub fn batches(&self) -> Vec<Vec<LedgerCall>> {
        self.batches.lock().unwrap().clone()
    }

    /// Proposal ids of each batch with the given method, in order.
    pub fn batch_ids(&self, method: LedgerMethod) -> Vec<Vec<ProposalId>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .filter(|batch| batch.first().is_some_and(|c| c.method == method))
            .map(|batch| batch.iter().filter_map(LedgerCall::proposal_id).collect())
            .collect()
    }

    /// Clear the batch log.
    pub fn reset(&self) {
        self.batches.lock().unwrap().clear();
    }

    fn answer(&self, call: &LedgerCall) -> CallOutcome {
        let id = call
            .proposal_id()
            .ok_or_else(|| CallError::Encoding("missing proposal id".into()))?;
        if self.failing.lock().unwrap().contains(&(call.method, id)) {
            return Err(CallError::Rpc {
                code: -32000,
                message: "scripted failure".into(),
            });
        }

        let mut states = self.states.lock().unwrap();
        let Some(queue) = states.get_mut(&id) else {
            return Err(CallError::Reverted("Governor: unknown proposal id".into()));
        };
        match call.method {
            LedgerMethod::State => {
                let state = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().copied()
                };
                state
                    .map(encode_state)
                    .ok_or_else(|| CallError::Reverted("Governor: unknown proposal id".into()))
            }
            LedgerMethod::HasVoted => {
                let voter = call.args.iter().find_map(|arg| match arg {
                    CallArg::Address(address) => Some(*address),
                    CallArg::Uint256(_) => None,
                });
                let voter = voter.ok_or_else(|| CallError::Encoding("missing voter".into()))?;
                let voted = self
                    .votes
                    .lock()
                    .unwrap()
                    .get(&(id, voter))
                    .copied()
                    .unwrap_or(false);
                Ok(encode_bool(voted))
            }
        }
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for NullLedger {
    async fn batch_read(&self, calls: &[LedgerCall]) -> Result<Vec<CallOutcome>, LedgerError> {
        self.batches.lock().unwrap().push(calls.to_vec());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unreachable("null ledger is down".into()));
        }
        Ok(calls.iter().map(|call| self.answer(call)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govsync_ledger::abi::{decode_bool, decode_state};

    fn governor() -> Address {
        Address::new([0x60; 20])
    }

    fn id(v: u64) -> ProposalId {
        ProposalId::from_u64(v)
    }

    #[tokio::test]
    async fn queued_states_advance_per_read() {
        let ledger = NullLedger::new();
        ledger.queue_states(id(1), &[ProposalState::Pending, ProposalState::Active]);
        let call = [LedgerCall::state(governor(), id(1))];

        let read = |outcomes: Vec<CallOutcome>| decode_state(outcomes[0].as_ref().unwrap()).unwrap();
        assert_eq!(read(ledger.batch_read(&call).await.unwrap()), ProposalState::Pending);
        assert_eq!(read(ledger.batch_read(&call).await.unwrap()), ProposalState::Active);
        assert_eq!(read(ledger.batch_read(&call).await.unwrap()), ProposalState::Active);
        assert_eq!(ledger.batches().len(), 3);
    }

    #[tokio::test]
    async fn unknown_ids_revert_and_votes_default_false() {
        let ledger = NullLedger::new();
        ledger.set_state(id(1), ProposalState::Active);
        let voter = Identity::new(Address::new([7; 20]));

        let outcomes = ledger
            .batch_read(&[
                LedgerCall::has_voted(governor(), id(1), *voter.address()),
                LedgerCall::state(governor(), id(2)),
            ])
            .await
            .unwrap();

        assert!(!decode_bool(outcomes[0].as_ref().unwrap()).unwrap());
        assert!(matches!(outcomes[1], Err(CallError::Reverted(_))));
    }

    #[tokio::test]
    async fn unavailable_fails_the_batch_but_still_records_it() {
        let ledger = NullLedger::new();
        ledger.set_unavailable(true);
        let result = ledger.batch_read(&[LedgerCall::state(governor(), id(1))]).await;
        assert!(result.is_err());
        assert_eq!(ledger.batch_ids(LedgerMethod::State), vec![vec![id(1)]]);
    }
}
