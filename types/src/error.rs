//! Error types shared across crates.

use crate::id::TransitionId;
use thiserror::Error;

/// Fault reported by the transition graph collaborator.
///
/// These signal an implementation inconsistency, not a business outcome, and
/// are propagated to the engine's caller as critical.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("transition {0} could not be resolved")]
    Unresolved(TransitionId),

    #[error("transition graph inconsistency: {0}")]
    Inconsistent(String),
}

/// A violated bound in [`crate::Parameters`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParametersError {
    #[error("sample size k must be positive")]
    ZeroSampleSize,

    #[error("alpha {alpha} must exceed k/2 and be at most k ({k})")]
    AlphaOutOfRange { alpha: usize, k: usize },

    #[error("beta_virtuous must be positive")]
    ZeroBetaVirtuous,

    #[error("beta_rogue {beta_rogue} must be >= beta_virtuous {beta_virtuous}")]
    BetaRogueBelowVirtuous { beta_rogue: u32, beta_virtuous: u32 },
}
