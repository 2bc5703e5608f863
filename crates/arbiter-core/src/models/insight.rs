//! Periodic learning artifacts computed over a window of the ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ApprovalPriority;

string_enum! {
    /// Confidence range a decision falls into.
    ConfidenceBucket {
        High => "high",
        Medium => "medium",
        Low => "low",
        /// The agent reported no confidence.
        Unknown => "unknown",
    }
}

impl ConfidenceBucket {
    pub fn classify(confidence: Option<f64>, high: f64, medium: f64) -> Self {
        match confidence {
            None => Self::Unknown,
            Some(c) if c >= high => Self::High,
            Some(c) if c >= medium => Self::Medium,
            Some(_) => Self::Low,
        }
    }
}

/// Outcome statistics for one slice of decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeStats {
    pub decisions: u64,
    pub evaluated: u64,
    pub successes: u64,
    /// `successes / evaluated`, 0 when nothing is evaluated.
    pub success_rate: f64,
    pub avg_outcome_value: Option<f64>,
}

/// Locally computed performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_decisions: u64,
    pub evaluated_decisions: u64,
    pub successful_decisions: u64,
    pub success_rate: f64,
    pub avg_outcome_value: Option<f64>,
    pub by_decision_type: BTreeMap<String, OutcomeStats>,
    pub by_confidence_bucket: BTreeMap<ConfidenceBucket, OutcomeStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightPattern {
    pub description: String,
    #[serde(default)]
    pub impact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    pub description: String,
    #[serde(default)]
    pub expected_improvement: Option<String>,
}

/// A new configuration proposed by the analysis dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedVariant {
    pub variant_label: String,
    /// Overrides the insight's decision type when set.
    #[serde(default)]
    pub decision_type: Option<String>,
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default)]
    pub system_instructions: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub rationale: String,
    /// Risk estimate, becomes the approval priority.
    #[serde(default)]
    pub risk: Option<ApprovalPriority>,
}

string_enum! {
    AnalysisStatus {
        Completed => "completed",
        /// The analysis dependency failed; only local metrics are present.
        Degraded => "degraded",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningInsight {
    pub id: String,
    pub agent_name: String,
    pub decision_type: Option<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_decisions: u64,
    pub avg_confidence: Option<f64>,
    pub metrics: PerformanceMetrics,
    pub patterns: Vec<InsightPattern>,
    pub suggestions: Vec<OptimizationSuggestion>,
    pub proposed_variants: Vec<ProposedVariant>,
    pub summary: String,
    pub analysis_status: AnalysisStatus,
    pub spawned_version_ids: Vec<String>,
    pub spawned_request_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}
