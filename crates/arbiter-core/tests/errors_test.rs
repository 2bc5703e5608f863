use arbiter_core::errors::*;

#[test]
fn not_found_carries_entity_and_id() {
    let err = ArbiterError::not_found("decision", "abc-123");
    let msg = err.to_string();
    assert!(msg.contains("decision"));
    assert!(msg.contains("abc-123"));
}

#[test]
fn invalid_state_carries_reason() {
    let err = ArbiterError::invalid_state("approval_request", "r-1", "already rejected");
    assert!(err.to_string().contains("already rejected"));
    assert!(err.is_caller_error());
}

#[test]
fn external_failure_is_not_a_caller_error() {
    let err = ArbiterError::external("insight_generator", "timeout");
    assert!(err.to_string().contains("insight_generator"));
    assert!(!err.is_caller_error());
}

// --- From impls ---

#[test]
fn storage_error_converts_to_arbiter_error() {
    let storage_err = StorageError::SqliteError {
        message: "disk full".into(),
    };
    let err: ArbiterError = storage_err.into();
    assert!(matches!(err, ArbiterError::StorageError(_)));
}

#[test]
fn serde_error_converts_to_arbiter_error() {
    let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: ArbiterError = serde_err.into();
    assert!(matches!(err, ArbiterError::SerializationError(_)));
}
