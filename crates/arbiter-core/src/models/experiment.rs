//! Controlled A/B comparisons between two versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    ExperimentStatus {
        Running => "running",
        Completed => "completed",
        Aborted => "aborted",
    }
}

impl ExperimentStatus {
    /// Terminal experiments are never re-opened.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

string_enum! {
    ExperimentWinner {
        Control => "control",
        Test => "test",
        Inconclusive => "inconclusive",
    }
}

string_enum! {
    /// One side of an experiment.
    Arm {
        Control => "control",
        Test => "test",
    }
}

/// Accumulated counts for one arm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmMetrics {
    /// Decisions routed to this arm.
    pub decisions: u64,
    /// Decisions that have at least one valued outcome.
    pub evaluated: u64,
    /// Evaluated decisions whose latest outcome met the success threshold.
    pub successes: u64,
    /// `successes / evaluated`, 0 when nothing is evaluated.
    pub success_rate: f64,
}

impl ArmMetrics {
    pub fn from_counts(decisions: u64, evaluated: u64, successes: u64) -> Self {
        let success_rate = if evaluated == 0 {
            0.0
        } else {
            successes as f64 / evaluated as f64
        };
        Self {
            decisions,
            evaluated,
            successes,
            success_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetrics {
    pub control: ArmMetrics,
    pub test: ArmMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub agent_name: String,
    pub decision_type: String,
    pub control_version_id: String,
    pub test_version_id: String,
    /// Percentage of traffic routed to the test arm.
    pub traffic_split: u8,
    pub target_sample_size: u64,
    pub current_sample_size: u64,
    pub metrics: ExperimentMetrics,
    pub significance: Option<f64>,
    pub status: ExperimentStatus,
    pub winner: Option<ExperimentWinner>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Wall-clock deadline after which the next refresh concludes the experiment.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Experiment {
    pub fn version_for(&self, arm: Arm) -> &str {
        match arm {
            Arm::Control => &self.control_version_id,
            Arm::Test => &self.test_version_id,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Input to `create_experiment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExperiment {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub control_version_id: String,
    pub test_version_id: String,
    pub traffic_split: u8,
    pub target_sample_size: u64,
}
