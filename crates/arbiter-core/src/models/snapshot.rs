use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-agent, per-day rollup. Keyed by (agent_name, snapshot_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub agent_name: String,
    pub snapshot_date: NaiveDate,
    pub total_decisions: u64,
    pub evaluated_decisions: u64,
    pub successful_decisions: u64,
    /// `successful / evaluated`, 0 when nothing is evaluated.
    pub accuracy: f64,
    pub avg_confidence: Option<f64>,
    pub active_versions: u64,
    pub running_experiments: u64,
    pub updated_at: DateTime<Utc>,
}
