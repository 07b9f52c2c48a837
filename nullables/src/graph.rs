//! Nullable transition graph — programmable transition statuses.

use snowstorm_types::{Status, TransitionError, TransitionGraph, TransitionId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    statuses: HashMap<TransitionId, Status>,
    faulty: HashSet<TransitionId>,
}

/// A transition graph whose answers are set by the test.
///
/// Clones share state, so a test can keep one clone and reprogram it after
/// handing another to the engine. Transitions never set are `Unknown`.
#[derive(Clone, Debug, Default)]
pub struct NullTransitionGraph {
    inner: Arc<Mutex<Inner>>,
}

impl NullTransitionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, transition: TransitionId, status: Status) {
        self.inner.lock().unwrap().statuses.insert(transition, status);
    }

    /// Mark the transition as accepted.
    pub fn accept(&self, transition: TransitionId) {
        self.set_status(transition, Status::Accepted);
    }

    /// Mark the transition as rejected.
    pub fn reject(&self, transition: TransitionId) {
        self.set_status(transition, Status::Rejected);
    }

    /// Make lookups of `transition` fail until [`NullTransitionGraph::heal`].
    pub fn fail(&self, transition: TransitionId) {
        self.inner.lock().unwrap().faulty.insert(transition);
    }

    pub fn heal(&self, transition: &TransitionId) {
        self.inner.lock().unwrap().faulty.remove(transition);
    }
}

impl TransitionGraph for NullTransitionGraph {
    fn status(&self, transition: &TransitionId) -> Result<Status, TransitionError> {
        let inner = self.inner.lock().unwrap();
        if inner.faulty.contains(transition) {
            return Err(TransitionError::Unresolved(*transition));
        }
        Ok(inner
            .statuses
            .get(transition)
            .copied()
            .unwrap_or(Status::Unknown))
    }
}
