use arbiter_core::models::{
    ApprovalPriority, ApprovalRequestType, NewApprovalRequest, NewDecision, NewVersion,
    VersionConfig,
};

/// A decision with a generic rationale.
pub fn decision(agent: &str, decision_type: &str, made: &str) -> NewDecision {
    NewDecision::new(agent, decision_type, made, format!("chose {made}"))
}

/// A configuration whose hash is distinct per `prompt`.
pub fn version_config(prompt: &str) -> VersionConfig {
    VersionConfig {
        prompt_template: Some(prompt.to_string()),
        system_instructions: Some("Be concise.".to_string()),
        parameters: serde_json::json!({ "temperature": 0.2 }),
    }
}

/// A `testing` version input carrying a config derived from the label.
pub fn new_version(agent: &str, decision_type: &str, label: &str) -> NewVersion {
    NewVersion::new(
        agent,
        decision_type,
        label,
        version_config(&format!("{agent}/{decision_type} prompt {label}")),
        "fixture",
    )
}

/// A medium-priority new-version request.
pub fn approval_request(version_id: &str, summary: &str) -> NewApprovalRequest {
    NewApprovalRequest::new(
        version_id,
        ApprovalRequestType::NewVersion,
        ApprovalPriority::Medium,
        summary,
        "low",
        "fixture",
    )
}
