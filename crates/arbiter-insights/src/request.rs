//! Builds the payload handed to the analysis dependency.

use chrono::{DateTime, Utc};

use arbiter_core::constants::MAX_ANALYSIS_SAMPLE;
use arbiter_core::models::{AnalysisRequest, DecisionRecord, DecisionSample, PerformanceMetrics};

/// The most recent `sample_size` decisions (capped), oldest first.
pub fn decision_sample(records: &[DecisionRecord], sample_size: usize) -> Vec<DecisionSample> {
    let take = sample_size.min(MAX_ANALYSIS_SAMPLE).min(records.len());
    records[records.len() - take..]
        .iter()
        .map(|record| DecisionSample {
            decision_type: record.decision.decision_type.clone(),
            decision_made: record.decision.decision_made.clone(),
            rationale: record.decision.rationale.clone(),
            confidence: record.decision.confidence.map(|c| c.value()),
            outcome_value: record.latest_score().map(|s| s.value()),
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub fn analysis_request(
    agent_name: &str,
    decision_type: Option<&str>,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    metrics: PerformanceMetrics,
    summary: String,
    records: &[DecisionRecord],
    sample_size: usize,
) -> AnalysisRequest {
    AnalysisRequest {
        agent_name: agent_name.to_string(),
        decision_type: decision_type.map(str::to_string),
        period_start,
        period_end,
        metrics,
        summary,
        sample: decision_sample(records, sample_size),
    }
}
