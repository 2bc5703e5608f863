//! Per-arm counts from ledger records.

use arbiter_core::models::{ArmMetrics, DecisionRecord};

/// Count decisions, evaluated decisions (at least one valued outcome), and
/// successes (latest valued outcome at or above `success_threshold`).
pub fn arm_metrics(records: &[DecisionRecord], success_threshold: f64) -> ArmMetrics {
    let mut evaluated = 0;
    let mut successes = 0;
    for record in records {
        if let Some(success) = record.is_success(success_threshold) {
            evaluated += 1;
            if success {
                successes += 1;
            }
        }
    }
    ArmMetrics::from_counts(records.len() as u64, evaluated, successes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::models::{FeedbackSource, NewDecision, NewOutcome};
    use chrono::Utc;

    fn record(values: &[Option<f64>]) -> DecisionRecord {
        let decision = NewDecision::new("a", "t", "x", "r").into_decision("d".into(), Utc::now());
        let outcomes = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                NewOutcome::new("d", "check", *v, FeedbackSource::Automated)
                    .into_outcome(format!("o{i}"), Utc::now())
            })
            .collect();
        DecisionRecord { decision, outcomes }
    }

    #[test]
    fn latest_valued_outcome_decides() {
        let records = vec![
            record(&[Some(90.0), Some(30.0)]),
            record(&[Some(30.0), Some(70.0)]),
            record(&[Some(95.0), None]),
            record(&[None]),
            record(&[]),
        ];
        let metrics = arm_metrics(&records, 70.0);
        assert_eq!(metrics.decisions, 5);
        assert_eq!(metrics.evaluated, 3);
        assert_eq!(metrics.successes, 2);
        assert!((metrics.success_rate - 2.0 / 3.0).abs() < 1e-12);
    }
}
