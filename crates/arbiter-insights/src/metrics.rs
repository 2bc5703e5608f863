//! Pure aggregation over ledger records. No I/O.

use std::collections::BTreeMap;

use arbiter_core::models::{ConfidenceBucket, DecisionRecord, OutcomeStats, PerformanceMetrics};

/// Running counts for one slice of decisions.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    decisions: u64,
    evaluated: u64,
    successes: u64,
    score_sum: f64,
}

impl Tally {
    fn add(&mut self, record: &DecisionRecord, success_threshold: f64) {
        self.decisions += 1;
        if let Some(score) = record.latest_score() {
            self.evaluated += 1;
            self.score_sum += score.value();
            if score.is_success(success_threshold) {
                self.successes += 1;
            }
        }
    }

    fn success_rate(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            self.successes as f64 / self.evaluated as f64
        }
    }

    fn avg_outcome_value(&self) -> Option<f64> {
        (self.evaluated > 0).then(|| self.score_sum / self.evaluated as f64)
    }

    fn into_stats(self) -> OutcomeStats {
        OutcomeStats {
            decisions: self.decisions,
            evaluated: self.evaluated,
            successes: self.successes,
            success_rate: self.success_rate(),
            avg_outcome_value: self.avg_outcome_value(),
        }
    }
}

/// Overall and per-slice outcome statistics. A decision is evaluated once it
/// has a valued outcome; it succeeds when its latest value meets
/// `success_threshold`.
pub fn performance_metrics(
    records: &[DecisionRecord],
    success_threshold: f64,
    high_confidence: f64,
    medium_confidence: f64,
) -> PerformanceMetrics {
    let mut overall = Tally::default();
    let mut by_type: BTreeMap<String, Tally> = BTreeMap::new();
    let mut by_bucket: BTreeMap<ConfidenceBucket, Tally> = BTreeMap::new();

    for record in records {
        overall.add(record, success_threshold);
        by_type
            .entry(record.decision.decision_type.clone())
            .or_default()
            .add(record, success_threshold);
        let bucket = ConfidenceBucket::classify(
            record.decision.confidence.map(|c| c.value()),
            high_confidence,
            medium_confidence,
        );
        by_bucket.entry(bucket).or_default().add(record, success_threshold);
    }

    PerformanceMetrics {
        total_decisions: overall.decisions,
        evaluated_decisions: overall.evaluated,
        successful_decisions: overall.successes,
        success_rate: overall.success_rate(),
        avg_outcome_value: overall.avg_outcome_value(),
        by_decision_type: by_type.into_iter().map(|(k, t)| (k, t.into_stats())).collect(),
        by_confidence_bucket: by_bucket.into_iter().map(|(k, t)| (k, t.into_stats())).collect(),
    }
}

/// Mean over decisions that reported a confidence.
pub fn avg_confidence(records: &[DecisionRecord]) -> Option<f64> {
    let (sum, count) = records
        .iter()
        .filter_map(|r| r.decision.confidence)
        .fold((0.0, 0u64), |(sum, count), c| (sum + c.value(), count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Natural-language rendering handed to the analysis dependency and used as
/// the insight summary when analysis is unavailable.
pub fn describe(metrics: &PerformanceMetrics, avg_confidence: Option<f64>) -> String {
    let mut text = format!(
        "{} decisions, {} evaluated, {} successful ({:.1}% success rate).",
        metrics.total_decisions,
        metrics.evaluated_decisions,
        metrics.successful_decisions,
        metrics.success_rate * 100.0
    );
    if let Some(confidence) = avg_confidence {
        text.push_str(&format!(" Average confidence {confidence:.2}."));
    }
    for (decision_type, stats) in &metrics.by_decision_type {
        text.push_str(&format!(
            "\n- type {decision_type}: {} decisions, {:.1}% success over {} evaluated",
            stats.decisions,
            stats.success_rate * 100.0,
            stats.evaluated
        ));
    }
    for (bucket, stats) in &metrics.by_confidence_bucket {
        text.push_str(&format!(
            "\n- {bucket} confidence: {} decisions, {:.1}% success over {} evaluated",
            stats.decisions,
            stats.success_rate * 100.0,
            stats.evaluated
        ));
    }
    text
}
