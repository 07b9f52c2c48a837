//! Conflict graph — partitions processing transactions into conflict sets.
//!
//! Conflicts are discovered as transactions arrive: a new transaction joins
//! the sets of every processing transaction that shares one of its inputs,
//! merging them into one. Sets live in an arena keyed by [`SetId`]; each
//! processing transaction records the id of the set that owns it. Sets are
//! never split. They only shrink when a member is finalized or rejected.

use crate::snowball::SnowballCounter;
use snowstorm_types::{InputId, TransitionId, Tx, TxId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Arena index of a conflict set.
pub type SetId = u64;

/// A processing transaction plus what the engine cached about it on `add`.
#[derive(Debug)]
pub struct Entry<T> {
    pub tx: T,
    pub set: SetId,
    pub inputs: Vec<InputId>,
    pub dependencies: Vec<TransitionId>,
    /// Insertion order across the whole graph.
    seq: u64,
}

/// Mutually exclusive processing transactions and their snowball counter.
#[derive(Clone, Debug)]
pub struct ConflictSet {
    /// Members in insertion order.
    members: Vec<TxId>,
    pub counter: SnowballCounter,
}

impl ConflictSet {
    pub fn members(&self) -> &[TxId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A set with a single member holds a virtuous transaction.
    pub fn is_virtuous(&self) -> bool {
        self.members.len() == 1
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.members.contains(id)
    }
}

impl fmt::Display for ConflictSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Members = [", self.counter)?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{member}")?;
        }
        f.write_str("]")
    }
}

/// Result of inserting a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Insertion {
    pub set: SetId,
    /// Number of pre-existing sets folded into `set`.
    pub merged: usize,
}

#[derive(Debug)]
pub struct ConflictGraph<T> {
    txs: HashMap<TxId, Entry<T>>,
    sets: BTreeMap<SetId, ConflictSet>,
    spenders: HashMap<InputId, HashSet<TxId>>,
    transitions: HashMap<TransitionId, HashSet<TxId>>,
    /// Transition -> processing transactions depending on it.
    dependents: HashMap<TransitionId, HashSet<TxId>>,
    next_set: SetId,
    next_seq: u64,
}

impl<T> Default for ConflictGraph<T> {
    fn default() -> Self {
        Self {
            txs: HashMap::new(),
            sets: BTreeMap::new(),
            spenders: HashMap::new(),
            transitions: HashMap::new(),
            dependents: HashMap::new(),
            next_set: 0,
            next_seq: 0,
        }
    }
}

impl<T: Tx> ConflictGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.txs.contains_key(id)
    }

    pub fn entry(&self, id: &TxId) -> Option<&Entry<T>> {
        self.txs.get(id)
    }

    pub fn get(&self, id: &TxId) -> Option<&T> {
        self.txs.get(id).map(|e| &e.tx)
    }

    pub fn set_of(&self, id: &TxId) -> Option<SetId> {
        self.txs.get(id).map(|e| e.set)
    }

    pub fn set(&self, set: SetId) -> Option<&ConflictSet> {
        self.sets.get(&set)
    }

    pub fn set_mut(&mut self, set: SetId) -> Option<&mut ConflictSet> {
        self.sets.get_mut(&set)
    }

    pub fn sets(&self) -> impl Iterator<Item = (SetId, &ConflictSet)> {
        self.sets.iter().map(|(id, set)| (*id, set))
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Sets holding a processing transaction that consumes any of `inputs`.
    pub fn conflicting_sets(&self, inputs: &[InputId]) -> BTreeSet<SetId> {
        inputs
            .iter()
            .filter_map(|input| self.spenders.get(input))
            .flatten()
            .filter_map(|id| self.set_of(id))
            .collect()
    }

    /// Other members of the set owning `id`.
    pub fn conflicts(&self, id: &TxId) -> Option<HashSet<TxId>> {
        let set = self.sets.get(&self.set_of(id)?)?;
        Some(set.members.iter().filter(|m| *m != id).copied().collect())
    }

    /// Whether any processing transaction carries `transition`.
    pub fn carries(&self, transition: &TransitionId) -> bool {
        self.transitions
            .get(transition)
            .is_some_and(|txs| !txs.is_empty())
    }

    /// Processing transactions carrying `transition`, in no particular order.
    pub fn processing_txs(&self, transition: &TransitionId) -> Vec<&T> {
        self.transitions
            .get(transition)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Processing transactions that depend on `transition`, in insertion
    /// order.
    pub fn dependents(&self, transition: &TransitionId) -> Vec<TxId> {
        let mut found: Vec<(u64, TxId)> = self
            .dependents
            .get(transition)
            .into_iter()
            .flatten()
            .filter_map(|id| self.txs.get(id).map(|e| (e.seq, *id)))
            .collect();
        found.sort_unstable();
        found.into_iter().map(|(_, id)| id).collect()
    }

    /// Insert a transaction that is not yet processing.
    ///
    /// Every set holding a conflicting transaction is merged into one; the
    /// surviving counter is the one that [outranks](SnowballCounter::outranks)
    /// the others, so no confidence is lost to the discovery of a conflict.
    pub fn insert(
        &mut self,
        tx: T,
        inputs: Vec<InputId>,
        dependencies: Vec<TransitionId>,
    ) -> Insertion {
        let id = tx.id();
        let transition = tx.transition_id();
        let touched = self.conflicting_sets(&inputs);

        let seq = self.next_seq;
        self.next_seq += 1;

        let (set, merged) = match self.pick_survivor(&touched) {
            None => {
                let set = self.next_set;
                self.next_set += 1;
                self.sets.insert(
                    set,
                    ConflictSet {
                        members: Vec::new(),
                        counter: SnowballCounter::new(id, set),
                    },
                );
                (set, 0)
            }
            Some(survivor) => {
                for absorbed in touched.iter().filter(|s| **s != survivor) {
                    self.absorb(survivor, *absorbed);
                }
                (survivor, touched.len() - 1)
            }
        };

        for input in &inputs {
            self.spenders.entry(*input).or_default().insert(id);
        }
        self.transitions.entry(transition).or_default().insert(id);
        for dependency in &dependencies {
            self.dependents.entry(*dependency).or_default().insert(id);
        }
        self.txs.insert(
            id,
            Entry {
                tx,
                set,
                inputs,
                dependencies,
                seq,
            },
        );
        if let Some(owner) = self.sets.get_mut(&set) {
            owner.members.push(id);
        }

        Insertion { set, merged }
    }

    /// Remove a processing transaction from the graph.
    ///
    /// If it was the set's preference, the earliest-added remaining member
    /// becomes the preference with zero confidence and a decided set is
    /// reopened. Empty sets are dropped.
    pub fn remove(&mut self, id: &TxId) -> Option<Entry<T>> {
        let entry = self.txs.remove(id)?;

        for input in &entry.inputs {
            if let Some(spenders) = self.spenders.get_mut(input) {
                spenders.remove(id);
                if spenders.is_empty() {
                    self.spenders.remove(input);
                }
            }
        }
        let transition = entry.tx.transition_id();
        if let Some(carriers) = self.transitions.get_mut(&transition) {
            carriers.remove(id);
            if carriers.is_empty() {
                self.transitions.remove(&transition);
            }
        }

        for dependency in &entry.dependencies {
            if let Some(waiting) = self.dependents.get_mut(dependency) {
                waiting.remove(id);
                if waiting.is_empty() {
                    self.dependents.remove(dependency);
                }
            }
        }

        if let Some(set) = self.sets.get_mut(&entry.set) {
            set.members.retain(|m| m != id);
            if set.members.is_empty() {
                self.sets.remove(&entry.set);
            } else if set.counter.preference() == *id {
                set.counter.reset_preference(set.members[0]);
            }
        }

        Some(entry)
    }

    fn pick_survivor(&self, candidates: &BTreeSet<SetId>) -> Option<SetId> {
        candidates
            .iter()
            .filter_map(|id| self.sets.get(id).map(|set| (*id, set)))
            .reduce(|best, next| {
                if next.1.counter.outranks(&best.1.counter) {
                    next
                } else {
                    best
                }
            })
            .map(|(id, _)| id)
    }

    /// Fold `absorbed` into `survivor`, keeping the survivor's counter.
    fn absorb(&mut self, survivor: SetId, absorbed: SetId) {
        let Some(gone) = self.sets.remove(&absorbed) else {
            return;
        };
        for member in &gone.members {
            if let Some(entry) = self.txs.get_mut(member) {
                entry.set = survivor;
            }
        }
        let txs = &self.txs;
        if let Some(set) = self.sets.get_mut(&survivor) {
            set.members.extend(gone.members);
            set.members
                .sort_by_key(|m| txs.get(m).map(|e| e.seq).unwrap_or(u64::MAX));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowstorm_nullables::NullTx;

    fn insert(graph: &mut ConflictGraph<NullTx>, tx: NullTx) -> Insertion {
        let inputs = tx.input_ids().unwrap();
        let deps = tx.dependencies().unwrap();
        graph.insert(tx, inputs, deps)
    }

    fn id(name: &str) -> TxId {
        NullTx::id_of(name)
    }

    #[test]
    fn disjoint_transactions_get_own_sets() {
        let mut graph = ConflictGraph::new();
        let a = insert(&mut graph, NullTx::new("a").spending("1"));
        let b = insert(&mut graph, NullTx::new("b").spending("2"));

        assert_ne!(a.set, b.set);
        assert_eq!(graph.set_count(), 2);
        assert!(graph.set(a.set).unwrap().is_virtuous());
        assert_eq!(graph.conflicts(&id("a")).unwrap(), HashSet::new());
    }

    #[test]
    fn shared_input_joins_set() {
        let mut graph = ConflictGraph::new();
        let a = insert(&mut graph, NullTx::new("a").spending("1"));
        let b = insert(&mut graph, NullTx::new("b").spending("1"));

        assert_eq!(a.set, b.set);
        assert_eq!(b.merged, 0);
        assert_eq!(graph.conflicts(&id("a")).unwrap(), HashSet::from([id("b")]));
        assert_eq!(graph.conflicts(&id("b")).unwrap(), HashSet::from([id("a")]));
        assert_eq!(graph.set(a.set).unwrap().counter.preference(), id("a"));
    }

    #[test]
    fn bridging_transaction_merges_sets() {
        let mut graph = ConflictGraph::new();
        insert(&mut graph, NullTx::new("a").spending("1"));
        insert(&mut graph, NullTx::new("c").spending("2"));
        let b = insert(&mut graph, NullTx::new("b").spending("1").spending("2"));

        assert_eq!(b.merged, 1);
        assert_eq!(graph.set_count(), 1);
        let set = graph.set(b.set).unwrap();
        assert_eq!(set.members(), &[id("a"), id("c"), id("b")]);
        assert_eq!(graph.set_of(&id("c")), Some(b.set));
    }

    #[test]
    fn merge_keeps_higher_confidence_counter() {
        let mut graph = ConflictGraph::new();
        let a = insert(&mut graph, NullTx::new("a").spending("1"));
        let c = insert(&mut graph, NullTx::new("c").spending("2"));
        graph.set_mut(c.set).unwrap().counter.record_success(id("c"));

        let b = insert(&mut graph, NullTx::new("b").spending("1").spending("2"));
        assert_eq!(b.set, c.set);
        assert!(graph.set(a.set).is_none());
        let counter = &graph.set(b.set).unwrap().counter;
        assert_eq!(counter.preference(), id("c"));
        assert_eq!(counter.confidence(), 1);
    }

    #[test]
    fn merge_tie_keeps_older_counter() {
        let mut graph = ConflictGraph::new();
        let a = insert(&mut graph, NullTx::new("a").spending("1"));
        insert(&mut graph, NullTx::new("c").spending("2"));
        let b = insert(&mut graph, NullTx::new("b").spending("1").spending("2"));

        assert_eq!(b.set, a.set);
        assert_eq!(graph.set(b.set).unwrap().counter.preference(), id("a"));
    }

    #[test]
    fn removal_reclassifies_survivor() {
        let mut graph = ConflictGraph::new();
        let a = insert(&mut graph, NullTx::new("a").spending("1"));
        insert(&mut graph, NullTx::new("b").spending("1"));
        assert!(!graph.set(a.set).unwrap().is_virtuous());

        let removed = graph.remove(&id("b")).unwrap();
        assert_eq!(removed.tx.id(), id("b"));
        assert!(graph.set(a.set).unwrap().is_virtuous());
        assert!(graph.conflicting_sets(&[NullTx::input_of("1")]).contains(&a.set));
    }

    #[test]
    fn removing_preference_resets_to_earliest_member() {
        let mut graph = ConflictGraph::new();
        let a = insert(&mut graph, NullTx::new("a").spending("1"));
        insert(&mut graph, NullTx::new("b").spending("1"));
        insert(&mut graph, NullTx::new("c").spending("1"));
        graph.set_mut(a.set).unwrap().counter.record_success(id("a"));

        graph.remove(&id("a"));
        let counter = &graph.set(a.set).unwrap().counter;
        assert_eq!(counter.preference(), id("b"));
        assert_eq!(counter.confidence(), 0);
    }

    #[test]
    fn removing_last_member_drops_set() {
        let mut graph = ConflictGraph::new();
        let a = insert(&mut graph, NullTx::new("a").spending("1"));
        graph.remove(&id("a"));
        assert!(graph.set(a.set).is_none());
        assert!(graph.is_empty());
        assert!(graph.remove(&id("a")).is_none());
    }

    #[test]
    fn removing_decided_preference_reopens_set() {
        let mut graph = ConflictGraph::new();
        let w = insert(&mut graph, NullTx::new("w").spending("1"));
        insert(&mut graph, NullTx::new("l").spending("1"));
        let counter = &mut graph.set_mut(w.set).unwrap().counter;
        counter.record_success(id("w"));
        assert!(counter.try_decide(1));

        graph.remove(&id("w"));
        let counter = &graph.set(w.set).unwrap().counter;
        assert!(!counter.is_decided());
        assert_eq!(counter.preference(), id("l"));
        assert_eq!(counter.confidence(), 0);
    }

    #[test]
    fn dependents_index_follows_membership() {
        let mut graph = ConflictGraph::new();
        insert(&mut graph, NullTx::new("d2").depending_on("p"));
        insert(&mut graph, NullTx::new("d1").depending_on("p").depending_on("q"));

        let p = NullTx::transition_of("p");
        assert_eq!(graph.dependents(&p), vec![id("d2"), id("d1")]);
        assert_eq!(graph.dependents(&NullTx::transition_of("q")), vec![id("d1")]);

        graph.remove(&id("d2"));
        assert_eq!(graph.dependents(&p), vec![id("d1")]);
        graph.remove(&id("d1"));
        assert!(graph.dependents(&p).is_empty());
        assert!(graph.dependents.is_empty());
    }

    #[test]
    fn transition_index() {
        let mut graph = ConflictGraph::new();
        insert(&mut graph, NullTx::new("a").spending("1"));
        insert(&mut graph, NullTx::new("a2").carrying("a").spending("1"));
        insert(&mut graph, NullTx::new("d").depending_on("a"));

        let tr = NullTx::transition_of("a");
        assert!(graph.carries(&tr));
        assert_eq!(graph.processing_txs(&tr).len(), 2);
        assert_eq!(graph.dependents(&tr), vec![id("d")]);

        graph.remove(&id("a"));
        graph.remove(&id("a2"));
        assert!(!graph.carries(&tr));
        assert!(graph.processing_txs(&tr).is_empty());
    }
}
