use serde::{Deserialize, Serialize};

use super::defaults;

/// Experiment engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Outcome value (0–100) at or above which a decision is a success.
    pub success_threshold: f64,
    /// Significance required to declare a winner.
    pub significance_threshold: f64,
    /// Wall-clock lifetime of a running experiment in days. 0 disables expiry.
    pub max_duration_days: u64,
}

impl ExperimentConfig {
    /// Lifetime as a duration. `None` when expiry is disabled or the value
    /// does not fit a `chrono::Duration`.
    pub fn max_duration(&self) -> Option<chrono::Duration> {
        if self.max_duration_days == 0 {
            return None;
        }
        i64::try_from(self.max_duration_days)
            .ok()
            .and_then(chrono::Duration::try_days)
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            success_threshold: defaults::DEFAULT_SUCCESS_THRESHOLD,
            significance_threshold: defaults::DEFAULT_SIGNIFICANCE_THRESHOLD,
            max_duration_days: defaults::DEFAULT_EXPERIMENT_MAX_DURATION_DAYS,
        }
    }
}
