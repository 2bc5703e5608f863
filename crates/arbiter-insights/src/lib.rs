//! # arbiter-insights
//!
//! Periodic aggregation over the ledger: local performance metrics →
//! external analysis (guarded) → proposed variants → versions and approval
//! requests. Plus idempotent per-day performance snapshots.

mod aggregator;
pub mod metrics;
pub mod parse;
pub mod request;

pub use aggregator::InsightAggregator;
pub use parse::{parse_analysis, AnalysisParse};
