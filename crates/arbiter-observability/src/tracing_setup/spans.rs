//! Span definitions per operation: ledger writes, version resolution,
//! experiments, approvals, insight analysis.

/// Create a ledger span.
#[macro_export]
macro_rules! ledger_span {
    ($operation:expr, $agent:expr) => {
        tracing::info_span!("arbiter.ledger", operation = $operation, agent = %$agent)
    };
}

/// Create a registry span.
#[macro_export]
macro_rules! registry_span {
    ($agent:expr, $decision_type:expr) => {
        tracing::info_span!("arbiter.registry", agent = %$agent, decision_type = %$decision_type)
    };
}

/// Create an experiment span.
#[macro_export]
macro_rules! experiment_span {
    ($operation:expr, $experiment_id:expr) => {
        tracing::info_span!("arbiter.experiment", operation = $operation, experiment_id = %$experiment_id)
    };
}

/// Create an approval span.
#[macro_export]
macro_rules! approval_span {
    ($operation:expr, $request_id:expr) => {
        tracing::info_span!("arbiter.approval", operation = $operation, request_id = %$request_id)
    };
}

/// Create an insight span.
#[macro_export]
macro_rules! insight_span {
    ($agent:expr) => {
        tracing::info_span!("arbiter.insight", agent = %$agent)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const LEDGER: &str = "arbiter.ledger";
    pub const REGISTRY: &str = "arbiter.registry";
    pub const EXPERIMENT: &str = "arbiter.experiment";
    pub const APPROVAL: &str = "arbiter.approval";
    pub const INSIGHT: &str = "arbiter.insight";
}
