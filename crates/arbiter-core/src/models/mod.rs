//! Persisted entities and the value types flowing between engines.

/// Declares a fieldless enum persisted as a lowercase string column.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($name))),
                }
            }
        }
    };
}

mod analysis;
mod approval;
mod audit;
mod decision;
mod experiment;
mod insight;
mod scores;
mod snapshot;
mod version;

pub use analysis::{AnalysisOutput, AnalysisRequest, DecisionSample};
pub use approval::{
    ApprovalPriority, ApprovalRequest, ApprovalRequestType, ApprovalStatus, NewApprovalRequest,
    ReviewTask,
};
pub use audit::{AuditEntity, AuditEntry, AuditOperation};
pub use decision::{Decision, DecisionQuery, DecisionRecord, FeedbackSource, NewDecision, NewOutcome, Outcome};
pub use experiment::{Arm, ArmMetrics, Experiment, ExperimentMetrics, ExperimentStatus, ExperimentWinner, NewExperiment};
pub use insight::{
    AnalysisStatus, ConfidenceBucket, InsightPattern, LearningInsight, OptimizationSuggestion,
    OutcomeStats, PerformanceMetrics, ProposedVariant,
};
pub use scores::{Confidence, OutcomeScore};
pub use snapshot::PerformanceSnapshot;
pub use version::{ActiveVersionView, NewVersion, Version, VersionConfig, VersionStatus};
