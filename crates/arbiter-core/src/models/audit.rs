use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    AuditEntity {
        Version => "version",
        Experiment => "experiment",
        ApprovalRequest => "approval_request",
        Insight => "insight",
    }
}

string_enum! {
    AuditOperation {
        Create => "create",
        Promote => "promote",
        Archive => "archive",
        Submit => "submit",
        Approve => "approve",
        Reject => "reject",
        Rollback => "rollback",
        Complete => "complete",
        Abort => "abort",
    }
}

/// One append-only audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entity: AuditEntity,
    pub entity_id: String,
    pub operation: AuditOperation,
    pub actor: String,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
