//! Fundamental types for the snowstorm consensus engine.
//!
//! Identifiers, decision statuses, the vote bag, snowball parameters, and
//! the capability traits through which the engine sees transactions and the
//! transition graph beneath them.

pub mod bag;
pub mod error;
pub mod id;
pub mod params;
pub mod status;
pub mod tx;

pub use bag::Bag;
pub use error::{ParametersError, TransitionError};
pub use id::{blake2b_256, InputId, NodeId, TransitionId, TxId};
pub use params::Parameters;
pub use status::Status;
pub use tx::{TransitionGraph, Tx};
