//! Nullable transaction — named, with explicit inputs and dependencies.

use snowstorm_types::{InputId, TransitionError, TransitionId, Tx, TxId};

/// A transaction whose identity, inputs, and dependencies are spelled out
/// by the test.
///
/// Identifiers are derived from names, so `NullTx::new("x")` always has the
/// same [`TxId`] and its own transition `"x"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NullTx {
    id: TxId,
    transition: TransitionId,
    inputs: Vec<InputId>,
    dependencies: Vec<TransitionId>,
    faulty: bool,
}

impl NullTx {
    pub fn new(name: &str) -> Self {
        Self {
            id: Self::id_of(name),
            transition: Self::transition_of(name),
            inputs: Vec::new(),
            dependencies: Vec::new(),
            faulty: false,
        }
    }

    /// The id `NullTx::new(name)` gets.
    pub fn id_of(name: &str) -> TxId {
        TxId::digest(format!("tx/{name}").as_bytes())
    }

    /// The transition `NullTx::new(name)` carries.
    pub fn transition_of(name: &str) -> TransitionId {
        TransitionId::digest(format!("transition/{name}").as_bytes())
    }

    /// The input named `name`.
    pub fn input_of(name: &str) -> InputId {
        InputId::digest(format!("input/{name}").as_bytes())
    }

    /// Consume the named input.
    pub fn spending(mut self, input: &str) -> Self {
        self.inputs.push(Self::input_of(input));
        self
    }

    /// Depend on the transition of the named transaction.
    pub fn depending_on(mut self, name: &str) -> Self {
        self.dependencies.push(Self::transition_of(name));
        self
    }

    /// Carry the transition of another named transaction instead of its own.
    pub fn carrying(mut self, name: &str) -> Self {
        self.transition = Self::transition_of(name);
        self
    }

    /// Make every capability call fail.
    pub fn faulty(mut self) -> Self {
        self.faulty = true;
        self
    }

    fn check(&self) -> Result<(), TransitionError> {
        if self.faulty {
            Err(TransitionError::Unresolved(self.transition))
        } else {
            Ok(())
        }
    }
}

impl Tx for NullTx {
    fn id(&self) -> TxId {
        self.id
    }

    fn transition_id(&self) -> TransitionId {
        self.transition
    }

    fn input_ids(&self) -> Result<Vec<InputId>, TransitionError> {
        self.check()?;
        Ok(self.inputs.clone())
    }

    fn dependencies(&self) -> Result<Vec<TransitionId>, TransitionError> {
        self.check()?;
        Ok(self.dependencies.clone())
    }
}
