//! holdbook-rebalancer: account composition and rebalancing plans from broker payloads.
//!
//! Reads a raw balance payload and a target allocation from JSON files,
//! normalizes and values the account with holdbook, computes the rebalance
//! plan, and prints it with an audit trail.

pub mod audit;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod target;
