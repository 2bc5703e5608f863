//! Health reporting from a point-in-time snapshot of engine counters.

mod reporter;

pub use reporter::{HealthReport, HealthReporter, HealthSnapshot, HealthStatus};
