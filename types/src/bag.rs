//! Vote bag — the responses collected by one network poll.

use crate::id::{NodeId, TxId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Peer responses from one completed poll.
///
/// Each responding peer maps to the transactions it currently prefers
/// (at most one per conflict set for an honest peer). A peer repeating the
/// same transaction is counted once; peers that did not respond are simply
/// absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bag {
    votes: BTreeMap<NodeId, BTreeSet<TxId>>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `peer` prefers `tx`. Returns false if the vote was
    /// already present.
    pub fn add(&mut self, peer: NodeId, tx: TxId) -> bool {
        self.votes.entry(peer).or_default().insert(tx)
    }

    /// Builder-style variant of [`Bag::add`].
    pub fn with_vote(mut self, peer: impl Into<NodeId>, tx: TxId) -> Self {
        self.add(peer.into(), tx);
        self
    }

    /// Number of distinct peers that voted for `tx`.
    pub fn count(&self, tx: &TxId) -> usize {
        self.votes.values().filter(|prefs| prefs.contains(tx)).count()
    }

    /// Vote count per transaction across all responders.
    pub fn tally(&self) -> HashMap<TxId, usize> {
        let mut tally = HashMap::new();
        for tx in self.votes.values().flatten() {
            *tally.entry(*tx).or_insert(0) += 1;
        }
        tally
    }

    /// Number of peers that responded.
    pub fn responders(&self) -> usize {
        self.votes.len()
    }

    /// Total number of (peer, transaction) votes.
    pub fn len(&self) -> usize {
        self.votes.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every `(peer, tx)` vote.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &TxId)> {
        self.votes
            .iter()
            .flat_map(|(peer, prefs)| prefs.iter().map(move |tx| (peer, tx)))
    }
}

impl FromIterator<(NodeId, TxId)> for Bag {
    fn from_iter<I: IntoIterator<Item = (NodeId, TxId)>>(iter: I) -> Self {
        let mut bag = Bag::new();
        for (peer, tx) in iter {
            bag.add(peer, tx);
        }
        bag
    }
}
