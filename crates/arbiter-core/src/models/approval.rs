//! Approval queue items gating promotion of a version to `active`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    ApprovalRequestType {
        /// A variant proposed by insight analysis.
        NewVersion => "new_version",
        /// The winning test arm of a completed experiment.
        ExperimentWinner => "experiment_winner",
        /// A change touching sensitive escalation behavior.
        EscalationChange => "escalation_change",
    }
}

string_enum! {
    /// Ordered: `Low < Medium < High`.
    ApprovalPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

string_enum! {
    ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub version_id: String,
    /// Decision type of the target version.
    pub decision_type: String,
    pub insight_id: Option<String>,
    pub experiment_id: Option<String>,
    pub request_type: ApprovalRequestType,
    pub priority: ApprovalPriority,
    pub change_summary: String,
    pub impact_analysis: serde_json::Value,
    pub risk_assessment: String,
    pub requested_by: String,
    pub status: ApprovalStatus,
    pub requires_human_review: bool,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    /// Rollout most recently applied through this request.
    pub approved_rollout: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// Input to `submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApprovalRequest {
    pub version_id: String,
    #[serde(default)]
    pub insight_id: Option<String>,
    #[serde(default)]
    pub experiment_id: Option<String>,
    pub request_type: ApprovalRequestType,
    pub priority: ApprovalPriority,
    pub change_summary: String,
    #[serde(default)]
    pub impact_analysis: serde_json::Value,
    pub risk_assessment: String,
    pub requested_by: String,
}

impl NewApprovalRequest {
    pub fn new(
        version_id: impl Into<String>,
        request_type: ApprovalRequestType,
        priority: ApprovalPriority,
        change_summary: impl Into<String>,
        risk_assessment: impl Into<String>,
        requested_by: impl Into<String>,
    ) -> Self {
        Self {
            version_id: version_id.into(),
            insight_id: None,
            experiment_id: None,
            request_type,
            priority,
            change_summary: change_summary.into(),
            impact_analysis: serde_json::json!({}),
            risk_assessment: risk_assessment.into(),
            requested_by: requested_by.into(),
        }
    }
}

/// Human-visible task created alongside every approval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewTask {
    pub id: String,
    pub approval_request_id: String,
    pub title: String,
    /// Change summary followed by the risk assessment.
    pub description: String,
    pub priority: ApprovalPriority,
    pub escalated: bool,
    pub created_at: DateTime<Utc>,
}
