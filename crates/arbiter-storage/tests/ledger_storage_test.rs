//! Decision ledger persistence: append-only rows, outcome foreign key,
//! range queries.

use chrono::{Duration, Utc};
use arbiter_core::errors::ArbiterError;
use arbiter_core::models::{DecisionQuery, FeedbackSource, NewDecision, NewOutcome};
use arbiter_core::traits::IDecisionStorage;
use arbiter_storage::StorageEngine;

fn id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[test]
fn decision_round_trips_with_outcomes() {
    let storage = StorageEngine::open_in_memory().unwrap();
    let decision = NewDecision::new("triage", "routing", "send_to_billing", "invoice keyword")
        .with_confidence(0.82)
        .with_version("v2", Some("concise".into()))
        .with_context(serde_json::json!({"ticket": 42}))
        .into_decision(id(), Utc::now());
    storage.insert_decision(&decision).unwrap();

    let outcome = NewOutcome::new(&decision.id, "resolution", Some(88.0), FeedbackSource::Human)
        .into_outcome(id(), Utc::now());
    storage.insert_outcome(&outcome).unwrap();

    let record = storage.get_decision(&decision.id).unwrap().unwrap();
    assert_eq!(record.decision.id, decision.id);
    assert_eq!(record.decision.context, serde_json::json!({"ticket": 42}));
    assert_eq!(record.decision.confidence.map(|c| c.value()), Some(0.82));
    assert_eq!(record.decision.variant_label.as_deref(), Some("concise"));
    assert_eq!(record.outcomes.len(), 1);
    assert_eq!(record.latest_score().map(|s| s.value()), Some(88.0));
}

#[test]
fn outcome_for_unknown_decision_is_not_found() {
    let storage = StorageEngine::open_in_memory().unwrap();
    let outcome = NewOutcome::new("missing", "resolution", Some(50.0), FeedbackSource::Automated)
        .into_outcome(id(), Utc::now());
    let err = storage.insert_outcome(&outcome).unwrap_err();
    assert!(matches!(err, ArbiterError::NotFound { entity: "decision", .. }));
}

#[test]
fn decisions_cannot_be_updated_or_deleted() {
    let storage = StorageEngine::open_in_memory().unwrap();
    let decision = NewDecision::new("triage", "routing", "a", "b").into_decision(id(), Utc::now());
    storage.insert_decision(&decision).unwrap();

    storage.pool().writer.with_conn_sync(|conn| {
        assert!(conn
            .execute("UPDATE decisions SET decision_made = 'x' WHERE id = ?1", [&decision.id])
            .is_err());
        assert!(conn
            .execute("DELETE FROM decisions WHERE id = ?1", [&decision.id])
            .is_err());
        Ok(())
    })
    .unwrap();

    let stored = storage.get_decision(&decision.id).unwrap().unwrap();
    assert_eq!(stored.decision.decision_made, "a");
}

#[test]
fn query_filters_by_range_type_and_label() {
    let storage = StorageEngine::open_in_memory().unwrap();
    let now = Utc::now();
    let rows = [
        ("routing", "v1", now - Duration::days(10)),
        ("routing", "v1", now - Duration::hours(2)),
        ("routing", "v2", now - Duration::hours(1)),
        ("pricing", "v1", now - Duration::minutes(30)),
    ];
    for (decision_type, label, at) in rows {
        let decision = NewDecision::new("triage", decision_type, "d", "r")
            .with_version(label, None)
            .into_decision(id(), at);
        storage.insert_decision(&decision).unwrap();
    }
    let other = NewDecision::new("pricer", "routing", "d", "r").into_decision(id(), now);
    storage.insert_decision(&other).unwrap();

    let since_yesterday = now - Duration::days(1);
    let all = storage
        .query_decisions(&DecisionQuery::for_agent("triage", since_yesterday))
        .unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].decision.created_at <= w[1].decision.created_at));

    let routing_v1 = storage
        .query_decisions(
            &DecisionQuery::for_agent("triage", since_yesterday)
                .decision_type("routing")
                .version_label("v1"),
        )
        .unwrap();
    assert_eq!(routing_v1.len(), 1);

    let bounded = storage
        .query_decisions(
            &DecisionQuery::for_agent("triage", since_yesterday).until(now - Duration::minutes(45)),
        )
        .unwrap();
    assert_eq!(bounded.len(), 2);
}
