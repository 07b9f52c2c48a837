use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use snowstorm_types::{Bag, NodeId, Parameters, TxId};

proptest! {
    /// Tally totals equal the number of distinct (peer, tx) votes.
    #[test]
    fn tally_sums_to_len(votes in prop::collection::vec((0u8..8, 0u8..4), 0..64)) {
        let bag: Bag = votes
            .iter()
            .map(|(p, t)| (NodeId::new(format!("peer{p}")), TxId::new([*t; 32])))
            .collect();

        let distinct: HashSet<_> = votes.iter().collect();
        prop_assert_eq!(bag.len(), distinct.len());
        prop_assert_eq!(bag.tally().values().sum::<usize>(), bag.len());
    }

    /// A transaction's count is the number of distinct peers naming it.
    #[test]
    fn count_is_distinct_peers(votes in prop::collection::vec((0u8..8, 0u8..4), 0..64)) {
        let bag: Bag = votes
            .iter()
            .map(|(p, t)| (NodeId::new(format!("peer{p}")), TxId::new([*t; 32])))
            .collect();

        let mut expected: HashMap<u8, HashSet<u8>> = HashMap::new();
        for (p, t) in &votes {
            expected.entry(*t).or_default().insert(*p);
        }
        for t in 0u8..4 {
            let want = expected.get(&t).map(HashSet::len).unwrap_or(0);
            prop_assert_eq!(bag.count(&TxId::new([t; 32])), want);
        }
    }

    /// Validation accepts exactly the documented parameter space.
    #[test]
    fn validate_matches_bounds(
        k in 0usize..32,
        alpha in 0usize..40,
        beta_virtuous in 0u32..10,
        beta_rogue in 0u32..10,
    ) {
        let params = Parameters::new(k, alpha, beta_virtuous, beta_rogue);
        let expected = k > 0
            && alpha > k / 2
            && alpha <= k
            && beta_virtuous > 0
            && beta_rogue >= beta_virtuous;
        prop_assert_eq!(params.validate().is_ok(), expected);
    }

    /// Digest-derived identifiers are stable.
    #[test]
    fn digest_stable(data in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assert_eq!(TxId::digest(&data), TxId::digest(&data));
    }
}
