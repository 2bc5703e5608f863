use serde::{Deserialize, Serialize};

use super::defaults;

/// Approval workflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Decision types whose changes always require human review.
    pub sensitive_decision_types: Vec<String>,
    /// Case-insensitive terms that mark request content as sensitive.
    pub sensitive_keywords: Vec<String>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            sensitive_decision_types: defaults::DEFAULT_SENSITIVE_DECISION_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sensitive_keywords: defaults::DEFAULT_SENSITIVE_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
