//! Poll aggregation — turns a vote bag into per-conflict-set round results.

use crate::conflict_graph::{ConflictGraph, SetId};
use snowstorm_types::{Bag, Tx, TxId};
use std::collections::BTreeMap;

/// Votes from one bag grouped by the conflict set of each candidate.
#[derive(Debug, Default)]
pub struct Tally {
    /// Vote count per candidate, for every set the bag touched.
    pub rounds: BTreeMap<SetId, BTreeMap<TxId, usize>>,
    /// Votes naming transactions that are not processing.
    pub ignored: usize,
}

/// Group the bag's votes by conflict set, dropping votes for transactions
/// that are not processing.
pub fn tally<T: Tx>(bag: &Bag, graph: &ConflictGraph<T>) -> Tally {
    let mut result = Tally::default();
    for (tx, count) in bag.tally() {
        match graph.set_of(&tx) {
            Some(set) => {
                result.rounds.entry(set).or_default().insert(tx, count);
            }
            None => {
                tracing::trace!(%tx, votes = count, "ignoring votes for unknown transaction");
                result.ignored += count;
            }
        }
    }
    result
}

/// The candidate that won a set's round, if any reached `alpha`.
///
/// With honest peers and `alpha > k/2` there is at most one. Otherwise the
/// highest count wins, then the current preference, then the smallest id.
pub fn round_winner(
    candidates: &BTreeMap<TxId, usize>,
    alpha: usize,
    preference: TxId,
) -> Option<TxId> {
    candidates
        .iter()
        .filter(|(_, count)| **count >= alpha)
        .max_by(|(a, ca), (b, cb)| {
            ca.cmp(cb)
                .then_with(|| (**a == preference).cmp(&(**b == preference)))
                .then_with(|| b.cmp(a))
        })
        .map(|(id, _)| *id)
}
