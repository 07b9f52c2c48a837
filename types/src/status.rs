//! Decision status of a transaction or transition.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Never seen.
    Unknown,
    /// Issued and still being voted on.
    Processing,
    /// Finalized as part of the accepted history.
    Accepted,
    /// Finalized as excluded from the accepted history.
    Rejected,
}

impl Status {
    /// Whether the status is terminal.
    pub fn decided(&self) -> bool {
        matches!(self, Status::Accepted | Status::Rejected)
    }

    pub fn fetched(&self) -> bool {
        !matches!(self, Status::Unknown)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Unknown => "Unknown",
            Status::Processing => "Processing",
            Status::Accepted => "Accepted",
            Status::Rejected => "Rejected",
        };
        f.write_str(name)
    }
}
