//! Decisions and the outcomes attached to them. Both are immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Confidence, OutcomeScore};

/// One logged agent choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub agent_name: String,
    /// Category string, e.g. "classification", "escalation_decision".
    pub decision_type: String,
    pub context: serde_json::Value,
    /// Human-readable description of the choice.
    pub decision_made: String,
    pub rationale: String,
    pub confidence: Option<Confidence>,
    /// Version label active when the decision was made.
    pub version_label: Option<String>,
    pub variant_label: Option<String>,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Input to `log_decision`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDecision {
    pub agent_name: String,
    pub decision_type: String,
    #[serde(default)]
    pub context: serde_json::Value,
    pub decision_made: String,
    pub rationale: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub version_label: Option<String>,
    #[serde(default)]
    pub variant_label: Option<String>,
    #[serde(default)]
    pub input: Option<serde_json::Value>,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
}

impl NewDecision {
    pub fn new(
        agent_name: impl Into<String>,
        decision_type: impl Into<String>,
        decision_made: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            decision_type: decision_type.into(),
            context: serde_json::json!({}),
            decision_made: decision_made.into(),
            rationale: rationale.into(),
            confidence: None,
            version_label: None,
            variant_label: None,
            input: None,
            output: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_version(mut self, version_label: impl Into<String>, variant: Option<String>) -> Self {
        self.version_label = Some(version_label.into());
        self.variant_label = variant;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_payloads(
        mut self,
        input: Option<serde_json::Value>,
        output: Option<serde_json::Value>,
    ) -> Self {
        self.input = input;
        self.output = output;
        self
    }

    /// Materialize into a stored record.
    pub fn into_decision(self, id: String, created_at: DateTime<Utc>) -> Decision {
        Decision {
            id,
            agent_name: self.agent_name,
            decision_type: self.decision_type,
            context: self.context,
            decision_made: self.decision_made,
            rationale: self.rationale,
            confidence: self.confidence.map(Confidence::new),
            version_label: self.version_label,
            variant_label: self.variant_label,
            input: self.input,
            output: self.output,
            created_at,
        }
    }
}

string_enum! {
    /// Where outcome feedback came from.
    FeedbackSource {
        Automated => "automated",
        Human => "human",
        Downstream => "downstream",
    }
}

/// Feedback on a decision, arriving any time after it was logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: String,
    pub decision_id: String,
    /// Domain-specific kind, e.g. "human_approval", "engagement", "roi".
    pub outcome_type: String,
    pub value: Option<OutcomeScore>,
    pub data: serde_json::Value,
    pub source: FeedbackSource,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input to `record_outcome`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOutcome {
    pub decision_id: String,
    pub outcome_type: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub data: serde_json::Value,
    pub source: FeedbackSource,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOutcome {
    pub fn new(
        decision_id: impl Into<String>,
        outcome_type: impl Into<String>,
        value: Option<f64>,
        source: FeedbackSource,
    ) -> Self {
        Self {
            decision_id: decision_id.into(),
            outcome_type: outcome_type.into(),
            value,
            data: serde_json::json!({}),
            source,
            notes: None,
        }
    }

    pub fn into_outcome(self, id: String, created_at: DateTime<Utc>) -> Outcome {
        Outcome {
            id,
            decision_id: self.decision_id,
            outcome_type: self.outcome_type,
            value: self.value.map(OutcomeScore::new),
            data: self.data,
            source: self.source,
            notes: self.notes,
            created_at,
        }
    }
}

/// A decision together with every outcome recorded so far, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision: Decision,
    pub outcomes: Vec<Outcome>,
}

impl DecisionRecord {
    /// The most recent outcome that carries a value.
    pub fn latest_score(&self) -> Option<OutcomeScore> {
        self.outcomes.iter().rev().find_map(|o| o.value)
    }

    /// `Some(true|false)` once a valued outcome exists, `None` while unevaluated.
    pub fn is_success(&self, threshold: f64) -> Option<bool> {
        self.latest_score().map(|s| s.is_success(threshold))
    }
}

/// Filter for ledger range reads.
#[derive(Debug, Clone)]
pub struct DecisionQuery {
    pub agent_name: String,
    pub decision_type: Option<String>,
    pub version_label: Option<String>,
    /// Inclusive lower bound.
    pub from: DateTime<Utc>,
    /// Exclusive upper bound. `None` means open-ended.
    pub to: Option<DateTime<Utc>>,
}

impl DecisionQuery {
    pub fn for_agent(agent_name: impl Into<String>, from: DateTime<Utc>) -> Self {
        Self {
            agent_name: agent_name.into(),
            decision_type: None,
            version_label: None,
            from,
            to: None,
        }
    }

    pub fn decision_type(mut self, decision_type: impl Into<String>) -> Self {
        self.decision_type = Some(decision_type.into());
        self
    }

    pub fn version_label(mut self, label: impl Into<String>) -> Self {
        self.version_label = Some(label.into());
        self
    }

    pub fn until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }
}
