/// Arbiter system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound of a rollout percentage or traffic split.
pub const MAX_PERCENT: u8 = 100;

/// Upper bound of the normalized outcome scale.
pub const MAX_OUTCOME_SCORE: f64 = 100.0;

/// Default outcome value at or above which a decision counts as a success.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 70.0;

/// Default significance a finished experiment must reach to declare a winner.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 0.95;

/// Maximum number of decisions handed to the external analysis dependency.
pub const MAX_ANALYSIS_SAMPLE: usize = 200;

/// Actor recorded in the audit log for engine-initiated transitions.
pub const SYSTEM_ACTOR: &str = "system";
