//! Capability traits consumed by the engine.
//!
//! The engine never looks at what a transaction does. It only needs to know
//! who it is, which contested state it touches, and which transitions it
//! builds on.

use crate::error::TransitionError;
use crate::id::{InputId, TransitionId, TxId};
use crate::status::Status;

/// A transaction the engine decides on.
pub trait Tx {
    /// Unique identifier.
    fn id(&self) -> TxId;

    /// The transition this transaction carries.
    fn transition_id(&self) -> TransitionId;

    /// Contested state consumed by this transaction. Transactions sharing an
    /// input conflict.
    fn input_ids(&self) -> Result<Vec<InputId>, TransitionError>;

    /// Transitions that must be accepted before this transaction can be.
    fn dependencies(&self) -> Result<Vec<TransitionId>, TransitionError>;
}

/// The transition graph the transactions are built on.
///
/// Consulted for dependencies that no transaction known to the engine
/// carries.
pub trait TransitionGraph {
    fn status(&self, transition: &TransitionId) -> Result<Status, TransitionError>;
}
