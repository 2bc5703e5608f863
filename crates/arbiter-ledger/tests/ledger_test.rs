//! DecisionLedger against the SQLite engine and a failing store.

use std::sync::Arc;

use chrono::{Duration, Utc};

use arbiter_core::errors::ArbiterError;
use arbiter_core::models::{FeedbackSource, NewOutcome};
use arbiter_ledger::DecisionLedger;
use arbiter_storage::StorageEngine;
use test_fixtures::{decision, load_fixture, GoldenScenario, UnavailableStore};

fn ledger() -> DecisionLedger {
    DecisionLedger::new(Arc::new(StorageEngine::open_in_memory().unwrap()))
}

#[test]
fn logs_decision_then_outcomes() {
    let ledger = ledger();
    let id = ledger
        .log_decision(decision("support-triage", "routing", "billing").with_confidence(0.7))
        .unwrap();
    ledger
        .record_outcome(NewOutcome::new(&id, "auto_check", Some(40.0), FeedbackSource::Automated))
        .unwrap();
    ledger
        .record_outcome(NewOutcome::new(&id, "csat", Some(95.0), FeedbackSource::Human))
        .unwrap();

    let record = ledger.get_decision(&id).unwrap().unwrap();
    assert_eq!(record.outcomes.len(), 2);
    assert_eq!(record.latest_score().map(|s| s.value()), Some(95.0));
}

#[test]
fn outcome_for_missing_decision_is_not_found() {
    let ledger = ledger();
    let err = ledger
        .record_outcome(NewOutcome::new("nope", "csat", Some(10.0), FeedbackSource::Human))
        .unwrap_err();
    assert!(matches!(err, ArbiterError::NotFound { .. }));
    assert!(ledger
        .record_outcome_best_effort(NewOutcome::new("nope", "csat", None, FeedbackSource::Human))
        .is_none());
}

#[test]
fn best_effort_swallows_store_failure() {
    let ledger = DecisionLedger::new(Arc::new(UnavailableStore));
    assert!(ledger.log_decision(decision("a", "t", "x")).is_err());
    assert!(ledger.log_decision_best_effort(decision("a", "t", "x")).is_none());
}

#[test]
fn out_of_range_values_are_clamped() {
    let ledger = ledger();
    let id = ledger
        .log_decision(decision("a", "t", "x").with_confidence(1.7))
        .unwrap();
    ledger
        .record_outcome(NewOutcome::new(&id, "csat", Some(140.0), FeedbackSource::Human))
        .unwrap();
    let record = ledger.get_decision(&id).unwrap().unwrap();
    assert_eq!(record.decision.confidence.map(|c| c.value()), Some(1.0));
    assert_eq!(record.latest_score().map(|s| s.value()), Some(100.0));
}

#[test]
fn range_read_matches_golden_scenario() {
    let scenario: GoldenScenario = load_fixture("golden/mixed_feedback.json");
    let ledger = ledger();
    let start = Utc::now() - Duration::seconds(1);
    for d in &scenario.decisions {
        let mut new = decision(&scenario.agent_name, &d.decision_type, &d.decision_made);
        if let Some(c) = d.confidence {
            new = new.with_confidence(c);
        }
        let id = ledger.log_decision(new).unwrap();
        if let Some(value) = d.outcome {
            ledger
                .record_outcome(NewOutcome::new(&id, "review", Some(value), FeedbackSource::Human))
                .unwrap();
        }
    }
    let end = Utc::now() + Duration::seconds(1);

    let all = ledger
        .decisions_in_range(&scenario.agent_name, None, start, end)
        .unwrap();
    assert_eq!(all.len() as u64, scenario.expected.total_decisions);
    let evaluated = all.iter().filter(|r| r.latest_score().is_some()).count() as u64;
    assert_eq!(evaluated, scenario.expected.evaluated_decisions);

    let routing = ledger
        .decisions_in_range(&scenario.agent_name, Some("routing"), start, end)
        .unwrap();
    assert_eq!(routing.len(), 3);
}
