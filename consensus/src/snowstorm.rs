//! Snowstorm — a snowball instance deciding between an unbounded number of
//! non-transitive conflicts.
//!
//! After sampling `k` peers for their preferences, feed the responses to
//! [`Snowstorm::record_poll`]. Each conflict set touched by the poll moves
//! its snowball counter; a set whose confidence reaches `beta_virtuous`
//! (single member) or `beta_rogue` (contested) is decided. A decided set is
//! frozen until every transition its winner depends on has been accepted:
//! then the winner is accepted and the other members are rejected. If a
//! dependency is rejected instead, the winner is rejected and the set is
//! reopened for its remaining members. Decided sets still waiting on
//! dependencies are re-checked on every poll, including empty ones.
//!
//! The engine is single-threaded and never blocks. Wrap it in
//! [`crate::actor`] to own it from a dedicated task.

use crate::conflict_graph::{ConflictGraph, SetId};
use crate::error::ConsensusError;
use crate::poll;
use snowstorm_types::{Bag, InputId, Parameters, Status, TransitionGraph, TransitionId, Tx, TxId};
use snowstorm_utils::StatsCounter;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// Counter names registered in [`Snowstorm::stats`].
pub const STAT_NAMES: &[&str] = &[
    "polls",
    "inconclusive_rounds",
    "ignored_votes",
    "accepted",
    "rejected",
    "merges",
];

/// What a call to [`Snowstorm::record_poll`] changed.
#[derive(Debug)]
pub struct PollResult<T> {
    /// Whether any status, preference, or confidence changed.
    pub changed: bool,
    /// Transactions accepted by this call; dependencies precede dependents.
    pub accepted: Vec<T>,
    /// Transactions rejected by this call.
    pub rejected: Vec<T>,
}

impl<T> Default for PollResult<T> {
    fn default() -> Self {
        Self {
            changed: false,
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

pub struct Snowstorm<T, G> {
    params: Parameters,
    graph: G,
    conflicts: ConflictGraph<T>,
    /// Status of every transaction ever handed to `add`.
    issued: HashMap<TxId, Status>,
    accepted: HashSet<TransitionId>,
    rejected: HashSet<TransitionId>,
    /// Inputs consumed by accepted transactions.
    consumed: HashSet<InputId>,
    /// Decided sets whose winner awaits its dependencies.
    pending: BTreeSet<SetId>,
    stats: StatsCounter,
}

impl<T: Tx, G: TransitionGraph> Snowstorm<T, G> {
    /// Create an engine with validated parameters. Parameters are fixed for
    /// the engine's lifetime.
    pub fn new(params: Parameters, graph: G) -> Result<Self, ConsensusError> {
        params.validate()?;
        Ok(Self {
            params,
            graph,
            conflicts: ConflictGraph::new(),
            issued: HashMap::new(),
            accepted: HashSet::new(),
            rejected: HashSet::new(),
            consumed: HashSet::new(),
            pending: BTreeSet::new(),
            stats: StatsCounter::new(STAT_NAMES),
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    /// Add a transaction to vote on.
    ///
    /// Adding a transaction that was already issued is a no-op. A transaction
    /// that can never be accepted is rejected immediately: one that depends on
    /// or carries a rejected transition, or spends an input an accepted
    /// transaction consumed. A transaction conflicting with a decided set
    /// joins it as a candidate that loses unless the decision is reopened;
    /// if it would also bridge that set to other sets it is rejected.
    pub fn add(&mut self, tx: T) -> Result<(), ConsensusError> {
        let id = tx.id();
        if self.issued.contains_key(&id) {
            tracing::trace!(%id, "ignoring duplicate add");
            return Ok(());
        }

        let inputs = tx.input_ids()?;
        let dependencies = tx.dependencies()?;
        let transition = tx.transition_id();

        let mut doomed = self.rejected.contains(&transition)
            || inputs.iter().any(|input| self.consumed.contains(input));
        for dependency in &dependencies {
            if doomed {
                break;
            }
            doomed = self.transition_status(dependency)? == Status::Rejected;
        }
        if !doomed {
            let touched = self.conflicts.conflicting_sets(&inputs);
            doomed = touched.len() > 1
                && touched
                    .iter()
                    .filter_map(|set| self.conflicts.set(*set))
                    .any(|set| set.counter.is_decided());
        }

        if doomed {
            tracing::info!(%id, "transaction rejected on add");
            self.issued.insert(id, Status::Rejected);
            self.stats.increment("rejected");
            let mut queue = VecDeque::new();
            self.orphan(transition, &mut queue);
            self.reject_all(queue, &mut Vec::new());
            return Ok(());
        }

        let insertion = self.conflicts.insert(tx, inputs, dependencies);
        self.issued.insert(id, Status::Processing);
        self.stats.add("merges", insertion.merged as u64);
        tracing::debug!(
            %id,
            set = insertion.set,
            merged = insertion.merged,
            "transaction added"
        );
        Ok(())
    }

    /// Collect the results of a network poll.
    ///
    /// Votes for transactions that are not processing are ignored. Only
    /// transition faults are errors; when one occurs the call stops, leaving
    /// the updates made so far in place.
    pub fn record_poll(&mut self, bag: &Bag) -> Result<PollResult<T>, ConsensusError> {
        self.stats.increment("polls");
        let mut result = PollResult::default();

        let tally = poll::tally(bag, &self.conflicts);
        self.stats.add("ignored_votes", tally.ignored as u64);

        let mut decided = Vec::new();
        for (set_id, candidates) in &tally.rounds {
            let Some(set) = self.conflicts.set_mut(*set_id) else {
                continue;
            };
            if set.counter.is_decided() {
                continue;
            }
            let beta = self.params.beta(set.len());
            match poll::round_winner(candidates, self.params.alpha, set.counter.preference()) {
                Some(winner) => {
                    result.changed |= set.counter.record_success(winner);
                    tracing::debug!(
                        set = *set_id,
                        %winner,
                        confidence = set.counter.confidence(),
                        beta,
                        "round won"
                    );
                    if set.counter.try_decide(beta) {
                        decided.push(*set_id);
                    }
                }
                None => {
                    set.counter.record_inconclusive();
                    self.stats.increment("inconclusive_rounds");
                }
            }
        }

        for set_id in decided {
            if let Some(set) = self.conflicts.set(set_id) {
                tracing::debug!(
                    set = set_id,
                    winner = %set.counter.preference(),
                    members = set.len(),
                    "conflict set decided"
                );
                self.pending.insert(set_id);
            }
        }

        self.apply_decisions(&mut result)?;
        result.changed |= !result.accepted.is_empty() || !result.rejected.is_empty();
        Ok(result)
    }

    /// Accept or reject decided winners whose dependencies have resolved,
    /// until no further progress is possible.
    fn apply_decisions(&mut self, result: &mut PollResult<T>) -> Result<(), ConsensusError> {
        loop {
            let mut progressed = false;
            for set_id in self.pending.clone() {
                // A cascade may have emptied or reopened the set.
                let winner = match self.conflicts.set(set_id) {
                    Some(set) if set.counter.is_decided() => set.counter.preference(),
                    _ => {
                        self.pending.remove(&set_id);
                        continue;
                    }
                };
                let status = match self.dependency_status(&winner) {
                    Ok(status) => status,
                    Err(err) => {
                        tracing::warn!(%winner, error = %err, "dependency resolution failed");
                        return Err(err);
                    }
                };
                match status {
                    Status::Accepted => {
                        self.pending.remove(&set_id);
                        self.accept(set_id, &winner, result);
                        progressed = true;
                    }
                    Status::Rejected => {
                        self.pending.remove(&set_id);
                        tracing::debug!(set = set_id, %winner, "decided winner lost a dependency");
                        self.reject_all(VecDeque::from([winner]), &mut result.rejected);
                        progressed = true;
                    }
                    _ => {}
                }
            }
            if !progressed {
                return Ok(());
            }
        }
    }

    /// Accept the winner of `set_id` and reject the rest of the set.
    fn accept(&mut self, set_id: SetId, id: &TxId, result: &mut PollResult<T>) {
        let losers: VecDeque<TxId> = self
            .conflicts
            .set(set_id)
            .map(|set| set.members().iter().filter(|m| *m != id).copied().collect())
            .unwrap_or_default();
        let Some(entry) = self.conflicts.remove(id) else {
            return;
        };
        tracing::info!(%id, "transaction accepted");
        self.issued.insert(*id, Status::Accepted);
        self.consumed.extend(entry.inputs.iter().copied());
        self.accepted.insert(entry.tx.transition_id());
        self.rejected.remove(&entry.tx.transition_id());
        self.stats.increment("accepted");
        result.accepted.push(entry.tx);
        self.reject_all(losers, &mut result.rejected);
    }

    /// Reject every queued transaction and, transitively, everything that
    /// depends on a transition left without a live carrier.
    fn reject_all(&mut self, mut queue: VecDeque<TxId>, rejected: &mut Vec<T>) {
        while let Some(id) = queue.pop_front() {
            let Some(entry) = self.conflicts.remove(&id) else {
                continue;
            };
            tracing::info!(%id, "transaction rejected");
            self.issued.insert(id, Status::Rejected);
            self.stats.increment("rejected");
            let transition = entry.tx.transition_id();
            rejected.push(entry.tx);
            self.orphan(transition, &mut queue);
        }
    }

    /// Mark `transition` rejected if nothing can still accept it, queueing
    /// its processing dependents for rejection.
    fn orphan(&mut self, transition: TransitionId, queue: &mut VecDeque<TxId>) {
        if self.accepted.contains(&transition) || self.conflicts.carries(&transition) {
            return;
        }
        if self.rejected.insert(transition) {
            queue.extend(self.conflicts.dependents(&transition));
        }
    }

    /// Combined status of a processing transaction's dependencies: rejected
    /// if any is rejected, processing if any is unresolved, else accepted.
    fn dependency_status(&self, id: &TxId) -> Result<Status, ConsensusError> {
        let Some(entry) = self.conflicts.entry(id) else {
            return Err(ConsensusError::NotFound(*id));
        };
        let mut combined = Status::Accepted;
        for dependency in &entry.dependencies {
            match self.transition_status(dependency)? {
                Status::Rejected => return Ok(Status::Rejected),
                Status::Accepted => {}
                _ => combined = Status::Processing,
            }
        }
        Ok(combined)
    }

    fn transition_status(&self, transition: &TransitionId) -> Result<Status, ConsensusError> {
        if self.accepted.contains(transition) {
            return Ok(Status::Accepted);
        }
        if self.conflicts.carries(transition) {
            return Ok(Status::Processing);
        }
        if self.rejected.contains(transition) {
            return Ok(Status::Rejected);
        }
        Ok(match self.graph.status(transition)? {
            Status::Accepted => Status::Accepted,
            Status::Rejected => Status::Rejected,
            Status::Processing | Status::Unknown => Status::Processing,
        })
    }

    /// Processing transactions with no live conflict.
    pub fn virtuous(&self) -> HashSet<TxId> {
        self.conflicts
            .sets()
            .filter(|(_, set)| set.is_virtuous())
            .flat_map(|(_, set)| set.members().iter().copied())
            .collect()
    }

    /// The preferred transaction of every conflict set.
    pub fn preferences(&self) -> HashSet<TxId> {
        self.conflicts
            .sets()
            .map(|(_, set)| set.counter.preference())
            .collect()
    }

    /// True iff no undecided virtuous transaction remains to poll for.
    ///
    /// Adding a new virtuous transaction un-quiesces the instance.
    pub fn quiesce(&self) -> bool {
        !self
            .conflicts
            .sets()
            .any(|(_, set)| set.is_virtuous() && !set.counter.is_decided())
    }

    /// True iff every added transaction has been accepted or rejected.
    pub fn finalized(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Whether `tx` has no processing conflict. For a transaction that is
    /// not processing, its inputs are checked against processing ones.
    pub fn is_virtuous(&self, tx: &T) -> Result<bool, ConsensusError> {
        let id = tx.id();
        if let Some(set) = self.conflicts.set_of(&id).and_then(|s| self.conflicts.set(s)) {
            return Ok(set.is_virtuous());
        }
        let inputs = tx.input_ids()?;
        Ok(self.conflicts.conflicting_sets(&inputs).is_empty())
    }

    /// The other members of `id`'s conflict set.
    pub fn conflicts(&self, id: &TxId) -> Result<HashSet<TxId>, ConsensusError> {
        self.conflicts
            .conflicts(id)
            .ok_or(ConsensusError::NotFound(*id))
    }

    /// Whether `id` was ever handed to `add`.
    pub fn issued(&self, id: &TxId) -> bool {
        self.issued.contains_key(id)
    }

    pub fn status(&self, id: &TxId) -> Status {
        self.issued.get(id).copied().unwrap_or(Status::Unknown)
    }

    /// Whether a transaction carrying `transition` is processing.
    pub fn processing(&self, transition: &TransitionId) -> bool {
        self.conflicts.carries(transition)
    }

    pub fn is_processing(&self, id: &TxId) -> bool {
        self.conflicts.contains(id)
    }

    /// Processing transactions carrying `transition`, unordered.
    pub fn processing_txs(&self, transition: &TransitionId) -> Vec<&T> {
        self.conflicts.processing_txs(transition)
    }

    pub fn get(&self, id: &TxId) -> Result<&T, ConsensusError> {
        self.conflicts.get(id).ok_or(ConsensusError::NotFound(*id))
    }

    /// Confidence of the set owning `id`, if it is processing.
    pub fn confidence(&self, id: &TxId) -> Option<u32> {
        let set = self.conflicts.set(self.conflicts.set_of(id)?)?;
        Some(set.counter.confidence())
    }
}

impl<T: Tx, G> fmt::Display for Snowstorm<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SS(NumSets = {}, Processing = {}, Pending = {})",
            self.conflicts.set_count(),
            self.conflicts.len(),
            self.pending.len()
        )?;
        for (i, (_, set)) in self.conflicts.sets().enumerate() {
            write!(f, "\n    Set[{i}] = {set}")?;
        }
        Ok(())
    }
}
