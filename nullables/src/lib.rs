//! Nullable infrastructure for deterministic testing.
//!
//! The engine only sees transactions and the transition graph through the
//! [`Tx`](snowstorm_types::Tx) and
//! [`TransitionGraph`](snowstorm_types::TransitionGraph) traits. This crate
//! provides implementations that:
//! - are built from short names instead of real payloads
//! - can be reprogrammed while the engine holds them
//! - can be told to fail, to exercise critical-fault paths

pub mod graph;
pub mod tx;

pub use graph::NullTransitionGraph;
pub use tx::NullTx;
