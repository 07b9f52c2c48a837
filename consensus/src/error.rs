use snowstorm_types::{ParametersError, TransitionError, TxId};
use snowstorm_utils::LoggingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    /// The transaction is not currently processing.
    #[error("transaction {0} is not processing")]
    NotFound(TxId),

    /// The transition graph reported an internal inconsistency. The engine
    /// stops the current operation; callers should treat this as fatal.
    #[error("critical transition fault: {0}")]
    Critical(#[from] TransitionError),

    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ParametersError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    /// The engine task has stopped.
    #[error("engine channel closed")]
    ChannelClosed,
}

impl ConsensusError {
    /// Whether the error is an implementation fault rather than a caller
    /// mistake.
    pub fn is_critical(&self) -> bool {
        matches!(self, ConsensusError::Critical(_))
    }
}
