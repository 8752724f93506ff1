//! Dialogue Engine: scripted branching dialogue over a deterministic world state.
//!
//! Compiles line-oriented dialogue scripts into typed node graphs, evaluates
//! a closed vocabulary of conditions and effects against a single owned
//! world state, and projects that state into localized, renderer-ready
//! snapshots after every player action.

pub mod core;
pub mod schema;
