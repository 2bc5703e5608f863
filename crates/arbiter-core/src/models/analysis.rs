//! Payloads exchanged with the external analysis dependency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{InsightPattern, OptimizationSuggestion, PerformanceMetrics, ProposedVariant};

/// One decision as shown to the analysis dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSample {
    pub decision_type: String,
    pub decision_made: String,
    pub rationale: String,
    pub confidence: Option<f64>,
    pub outcome_value: Option<f64>,
}

/// Everything the analysis dependency receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub agent_name: String,
    pub decision_type: Option<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub metrics: PerformanceMetrics,
    /// Natural-language rendering of `metrics`.
    pub summary: String,
    pub sample: Vec<DecisionSample>,
}

/// The structured document the analysis dependency must return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    #[serde(default)]
    pub patterns: Vec<InsightPattern>,
    #[serde(default)]
    pub suggestions: Vec<OptimizationSuggestion>,
    #[serde(default)]
    pub variants: Vec<ProposedVariant>,
    #[serde(default)]
    pub summary: Option<String>,
}
