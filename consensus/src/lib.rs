//! Snowstorm consensus — conflict-aware snowball over a growing set of
//! transactions.
//!
//! Nodes repeatedly poll small random samples of peers for their preferred
//! transactions and feed each completed poll to the engine. Transactions
//! that share contested inputs are grouped into conflict sets; each set runs
//! a snowball counter and is finalized once its preference has won enough
//! consecutive rounds.
//!
//! ## Module overview
//!
//! - [`snowstorm`] — The engine: `add`, `record_poll`, and the query surface.
//! - [`conflict_graph`] — Conflict-set partition and virtuous/rogue classification.
//! - [`snowball`] — Per-set preference and confidence counter.
//! - [`poll`] — Vote bag aggregation and round winners.
//! - [`actor`] — Owning task and async handle.
//! - [`config`] — TOML-backed engine configuration.
//! - [`error`] — Consensus error types.

pub mod actor;
pub mod config;
pub mod conflict_graph;
pub mod error;
pub mod poll;
pub mod snowball;
pub mod snowstorm;

pub use actor::{spawn, EngineHandle};
pub use config::EngineConfig;
pub use conflict_graph::{ConflictGraph, ConflictSet, SetId};
pub use error::ConsensusError;
pub use snowball::{RoundOutcome, SnowballCounter};
pub use snowstorm::{PollResult, Snowstorm};
