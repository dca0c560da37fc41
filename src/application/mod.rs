//! Application layer: the `Marketplace` engine and its operations.
//!
//! Operations are split by concern. Each one authenticates its caller, reads through
//! the `Store` and ends with exactly one atomic commit.

pub mod admin;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod proof_intake;
pub mod queries;
pub mod registry;
