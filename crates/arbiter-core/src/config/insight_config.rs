use serde::{Deserialize, Serialize};

use super::defaults;

/// Insight aggregator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Number of decisions included in the analysis request.
    pub decision_sample_size: usize,
    /// Lower bound of the `high` confidence bucket.
    pub high_confidence: f64,
    /// Lower bound of the `medium` confidence bucket.
    pub medium_confidence: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            decision_sample_size: defaults::DEFAULT_DECISION_SAMPLE_SIZE,
            high_confidence: defaults::DEFAULT_HIGH_CONFIDENCE,
            medium_confidence: defaults::DEFAULT_MEDIUM_CONFIDENCE,
        }
    }
}
