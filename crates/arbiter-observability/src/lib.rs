//! # arbiter-observability
//!
//! Tracing subscriber setup, per-operation span macros, degradation events,
//! and a health report summarizing the engine's queues.

pub mod health;
pub mod tracing_setup;

pub use health::{HealthReport, HealthReporter, HealthSnapshot, HealthStatus};
pub use tracing_setup::{init_tracing, init_tracing_with_filter};
