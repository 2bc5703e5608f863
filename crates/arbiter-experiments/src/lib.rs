//! # arbiter-experiments
//!
//! Controlled comparisons between a control and a test version: random
//! traffic allocation, per-arm success metrics from the ledger, a pooled
//! two-proportion significance gate, and an approval request for a winning
//! test version.

pub mod allocation;
mod allocator;
mod engine;
pub mod metrics;
pub mod significance;

pub use allocator::TrafficAllocator;
pub use engine::ExperimentEngine;
