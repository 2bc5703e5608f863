//! Aggregate health report generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters gathered from storage by the caller.
#[derive(Debug, Clone, Default)]
pub struct HealthSnapshot {
    pub schema_version: u32,
    pub expected_schema_version: u32,
    pub wal_enabled: bool,
    pub file_backed: bool,
    pub decisions_logged: u64,
    pub pending_approvals: u64,
    pub running_experiments: u64,
    pub open_review_tasks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub decisions_logged: u64,
    pub pending_approvals: u64,
    pub running_experiments: u64,
    pub open_review_tasks: u64,
    pub issues: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Pending approvals above this count mark the report degraded.
const APPROVAL_BACKLOG_LIMIT: u64 = 50;

pub struct HealthReporter;

impl HealthReporter {
    /// Build a report. A schema behind the binary is unhealthy; a file
    /// database without WAL or a large approval backlog is degraded.
    pub fn build(snapshot: &HealthSnapshot) -> HealthReport {
        let mut status = HealthStatus::Healthy;
        let mut issues = Vec::new();

        if snapshot.schema_version < snapshot.expected_schema_version {
            status = HealthStatus::Unhealthy;
            issues.push(format!(
                "schema at v{}, expected v{}",
                snapshot.schema_version, snapshot.expected_schema_version
            ));
        }
        if snapshot.file_backed && !snapshot.wal_enabled {
            status = worst(status, HealthStatus::Degraded);
            issues.push("write-ahead log disabled".to_string());
        }
        if snapshot.pending_approvals > APPROVAL_BACKLOG_LIMIT {
            status = worst(status, HealthStatus::Degraded);
            issues.push(format!(
                "{} approval requests pending review",
                snapshot.pending_approvals
            ));
        }

        HealthReport {
            status,
            decisions_logged: snapshot.decisions_logged,
            pending_approvals: snapshot.pending_approvals,
            running_experiments: snapshot.running_experiments,
            open_review_tasks: snapshot.open_review_tasks,
            issues,
            generated_at: Utc::now(),
        }
    }
}

fn worst(a: HealthStatus, b: HealthStatus) -> HealthStatus {
    match (a, b) {
        (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
        (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    }
}
