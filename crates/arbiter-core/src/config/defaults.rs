// Single source of truth for all default values.

// --- Storage ---
pub const DEFAULT_DB_FILENAME: &str = "arbiter.db";
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

// --- Experiments ---
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = crate::constants::DEFAULT_SUCCESS_THRESHOLD;
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = crate::constants::DEFAULT_SIGNIFICANCE_THRESHOLD;
pub const DEFAULT_EXPERIMENT_MAX_DURATION_DAYS: u64 = 30;
pub const MAX_EXPERIMENT_DURATION_DAYS: u64 = 3650;

// --- Approval ---
pub const DEFAULT_SENSITIVE_DECISION_TYPES: &[&str] = &["escalation_decision"];
pub const DEFAULT_SENSITIVE_KEYWORDS: &[&str] = &[
    "escalation",
    "escalate",
    "legal",
    "refund",
    "complaint",
    "compliance",
];

// --- Insights ---
pub const DEFAULT_DECISION_SAMPLE_SIZE: usize = 20;
pub const DEFAULT_HIGH_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_MEDIUM_CONFIDENCE: f64 = 0.5;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_JSON_LOGS: bool = true;
