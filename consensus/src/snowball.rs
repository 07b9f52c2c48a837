//! Snowball counter — per conflict set preference and confidence.
//!
//! A counter only moves on rounds where some member of its set reached
//! quorum. A win for the current preference increments the confidence; a
//! win for another member switches the preference and restarts confidence
//! at one. Inconclusive rounds leave both untouched.

use snowstorm_types::TxId;
use std::fmt;

/// Outcome of the most recent poll round that touched a conflict set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    /// No round has touched the set yet.
    None,
    /// The named member reached quorum.
    Won(TxId),
    /// Members received votes but none reached quorum.
    Inconclusive,
}

#[derive(Clone, Debug)]
pub struct SnowballCounter {
    preference: TxId,
    confidence: u32,
    last_outcome: RoundOutcome,
    /// Creation order; lower is older. Breaks confidence ties on merge.
    created: u64,
    decided: bool,
}

impl SnowballCounter {
    pub fn new(preference: TxId, created: u64) -> Self {
        Self {
            preference,
            confidence: 0,
            last_outcome: RoundOutcome::None,
            created,
            decided: false,
        }
    }

    pub fn preference(&self) -> TxId {
        self.preference
    }

    pub fn confidence(&self) -> u32 {
        self.confidence
    }

    pub fn last_outcome(&self) -> RoundOutcome {
        self.last_outcome
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn is_decided(&self) -> bool {
        self.decided
    }

    /// Record a round won by `winner`.
    ///
    /// Returns false, changing nothing, once the counter is decided.
    pub fn record_success(&mut self, winner: TxId) -> bool {
        if self.decided {
            return false;
        }
        self.last_outcome = RoundOutcome::Won(winner);
        if winner == self.preference {
            self.confidence = self.confidence.saturating_add(1);
        } else {
            self.preference = winner;
            self.confidence = 1;
        }
        true
    }

    /// Record a round in which no member reached quorum.
    pub fn record_inconclusive(&mut self) {
        if !self.decided {
            self.last_outcome = RoundOutcome::Inconclusive;
        }
    }

    /// Mark the counter decided if confidence reached `beta`.
    ///
    /// Returns true only on the transition into the decided state.
    pub fn try_decide(&mut self, beta: u32) -> bool {
        if self.decided || self.confidence < beta {
            return false;
        }
        self.decided = true;
        true
    }

    /// Point the counter at a new preference with no confidence. Used when
    /// the preferred member leaves the set without being accepted; a decided
    /// counter is reopened, since its decision named the departed member.
    pub fn reset_preference(&mut self, preference: TxId) {
        self.preference = preference;
        self.confidence = 0;
        self.last_outcome = RoundOutcome::None;
        self.decided = false;
    }

    /// Whether this counter survives a merge with `other`: strictly higher
    /// confidence wins, ties go to the older counter.
    pub fn outranks(&self, other: &SnowballCounter) -> bool {
        (self.confidence, std::cmp::Reverse(self.created))
            > (other.confidence, std::cmp::Reverse(other.created))
    }
}

impl fmt::Display for SnowballCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SB(Preference = {}, Confidence = {}, Decided = {})",
            self.preference, self.confidence, self.decided
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> TxId {
        TxId::new([n; 32])
    }

    #[test]
    fn new_counter_has_no_confidence() {
        let c = SnowballCounter::new(id(1), 0);
        assert_eq!(c.preference(), id(1));
        assert_eq!(c.confidence(), 0);
        assert_eq!(c.last_outcome(), RoundOutcome::None);
        assert!(!c.is_decided());
    }

    #[test]
    fn consecutive_wins_accumulate() {
        let mut c = SnowballCounter::new(id(1), 0);
        assert!(c.record_success(id(1)));
        assert!(c.record_success(id(1)));
        assert_eq!(c.confidence(), 2);
        assert_eq!(c.last_outcome(), RoundOutcome::Won(id(1)));
    }

    #[test]
    fn win_for_other_member_flips_preference() {
        let mut c = SnowballCounter::new(id(1), 0);
        c.record_success(id(1));
        c.record_success(id(1));
        c.record_success(id(2));
        assert_eq!(c.preference(), id(2));
        assert_eq!(c.confidence(), 1);
    }

    #[test]
    fn inconclusive_round_keeps_confidence() {
        let mut c = SnowballCounter::new(id(1), 0);
        c.record_success(id(1));
        c.record_inconclusive();
        assert_eq!(c.confidence(), 1);
        assert_eq!(c.preference(), id(1));
        assert_eq!(c.last_outcome(), RoundOutcome::Inconclusive);
    }

    #[test]
    fn decides_at_beta_once() {
        let mut c = SnowballCounter::new(id(1), 0);
        c.record_success(id(1));
        assert!(!c.try_decide(2));
        c.record_success(id(1));
        assert!(c.try_decide(2));
        assert!(c.is_decided());
        assert!(!c.try_decide(2));
    }

    #[test]
    fn decided_counter_is_frozen() {
        let mut c = SnowballCounter::new(id(1), 0);
        c.record_success(id(1));
        assert!(c.try_decide(1));
        assert!(!c.record_success(id(2)));
        c.record_inconclusive();
        assert_eq!(c.preference(), id(1));
        assert_eq!(c.confidence(), 1);
        assert_eq!(c.last_outcome(), RoundOutcome::Won(id(1)));
    }

    #[test]
    fn reset_preference_clears_confidence() {
        let mut c = SnowballCounter::new(id(1), 0);
        c.record_success(id(1));
        c.reset_preference(id(3));
        assert_eq!(c.preference(), id(3));
        assert_eq!(c.confidence(), 0);
    }

    #[test]
    fn reset_preference_reopens_decided_counter() {
        let mut c = SnowballCounter::new(id(1), 0);
        c.record_success(id(1));
        assert!(c.try_decide(1));

        c.reset_preference(id(2));
        assert!(!c.is_decided());
        assert_eq!(c.last_outcome(), RoundOutcome::None);
        assert!(c.record_success(id(2)));
        assert_eq!(c.confidence(), 1);
    }

    #[test]
    fn merge_rank_prefers_confidence_then_age() {
        let mut older = SnowballCounter::new(id(1), 0);
        let mut newer = SnowballCounter::new(id(2), 1);
        assert!(older.outranks(&newer));
        assert!(!newer.outranks(&older));

        newer.record_success(id(2));
        assert!(newer.outranks(&older));

        older.record_success(id(1));
        assert!(older.outranks(&newer));
    }
}
