//! Snowball parameters — sample size, quorum, and finalization thresholds.

use crate::error::ParametersError;
use serde::{Deserialize, Serialize};

/// Parameters a snowstorm instance is configured with once, at construction.
///
/// Missing fields deserialize to their [`Default`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Number of peers sampled per poll.
    pub k: usize,
    /// Votes a candidate needs within one poll to win the round.
    pub alpha: usize,
    /// Consecutive successful rounds that finalize a conflict set with a
    /// single member.
    pub beta_virtuous: u32,
    /// Consecutive successful rounds that finalize a contested conflict set.
    pub beta_rogue: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            k: 20,
            alpha: 15,
            beta_virtuous: 15,
            beta_rogue: 20,
        }
    }
}

impl Parameters {
    pub fn new(k: usize, alpha: usize, beta_virtuous: u32, beta_rogue: u32) -> Self {
        Self {
            k,
            alpha,
            beta_virtuous,
            beta_rogue,
        }
    }

    /// Check the parameters describe a safe instance.
    ///
    /// `alpha` must be a strict majority of `k` so that at most one candidate
    /// per conflict set can win a round of honest responses.
    pub fn validate(&self) -> Result<(), ParametersError> {
        if self.k == 0 {
            return Err(ParametersError::ZeroSampleSize);
        }
        if self.alpha <= self.k / 2 || self.alpha > self.k {
            return Err(ParametersError::AlphaOutOfRange {
                alpha: self.alpha,
                k: self.k,
            });
        }
        if self.beta_virtuous == 0 {
            return Err(ParametersError::ZeroBetaVirtuous);
        }
        if self.beta_rogue < self.beta_virtuous {
            return Err(ParametersError::BetaRogueBelowVirtuous {
                beta_rogue: self.beta_rogue,
                beta_virtuous: self.beta_virtuous,
            });
        }
        Ok(())
    }

    /// Confidence needed to finalize a conflict set of `size` members.
    pub fn beta(&self, size: usize) -> u32 {
        if size <= 1 {
            self.beta_virtuous
        } else {
            self.beta_rogue
        }
    }
}
