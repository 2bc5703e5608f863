//! ExperimentEngine end to end over in-memory storage: creation rules,
//! routing through the registry, metric refresh and the significance gate.

use std::sync::Arc;

use chrono::{Duration, Utc};

use arbiter_approval::ApprovalWorkflow;
use arbiter_core::config::{ApprovalConfig, ExperimentConfig, RegistryConfig};
use arbiter_core::errors::ArbiterError;
use arbiter_core::models::{
    ApprovalPriority, ApprovalRequestType, ArmMetrics, Experiment, ExperimentMetrics,
    ExperimentStatus, ExperimentWinner, FeedbackSource, NewExperiment, NewOutcome, VersionStatus,
};
use arbiter_core::traits::{IExperimentStorage, SeededRandom};
use arbiter_experiments::{significance, ExperimentEngine, TrafficAllocator};
use arbiter_ledger::DecisionLedger;
use arbiter_registry::VersionRegistry;
use arbiter_storage::StorageEngine;
use test_fixtures::{decision, load_fixture, new_version, SignificanceCase};

const AGENT: &str = "support-triage";
const TYPE: &str = "routing";

struct Harness {
    storage: Arc<StorageEngine>,
    registry: Arc<VersionRegistry>,
    approval: Arc<ApprovalWorkflow>,
    ledger: DecisionLedger,
    engine: ExperimentEngine,
}

fn harness() -> Harness {
    harness_with(ExperimentConfig::default())
}

fn harness_with(config: ExperimentConfig) -> Harness {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let allocator = Arc::new(TrafficAllocator::new(
        storage.clone(),
        storage.clone(),
        Arc::new(SeededRandom::new(7)),
    ));
    let registry = Arc::new(
        VersionRegistry::new(storage.clone(), &RegistryConfig::default())
            .with_traffic_resolver(allocator.clone()),
    );
    let approval = Arc::new(
        ApprovalWorkflow::new(
            storage.clone(),
            registry.clone(),
            storage.clone(),
            &ApprovalConfig::default(),
        )
        .unwrap(),
    );
    let engine = ExperimentEngine::new(
        storage.clone(),
        storage.clone(),
        registry.clone(),
        allocator,
        approval.clone(),
        config,
    );
    Harness {
        ledger: DecisionLedger::new(storage.clone()),
        storage,
        registry,
        approval,
        engine,
    }
}

/// Active control C at full rollout plus a testing candidate V.
fn control_and_candidate(h: &Harness) -> (String, String) {
    let control = h
        .registry
        .create_version(new_version(AGENT, TYPE, "C").with_status(VersionStatus::Active, 100))
        .unwrap();
    let test = h.registry.create_version(new_version(AGENT, TYPE, "V")).unwrap();
    (control, test)
}

fn experiment(control: &str, test: &str, split: u8, target: u64) -> NewExperiment {
    NewExperiment {
        name: "shorter routing prompt".to_string(),
        description: None,
        control_version_id: control.to_string(),
        test_version_id: test.to_string(),
        traffic_split: split,
        target_sample_size: target,
    }
}

/// Log one decision tagged with `label` and score it.
fn scored_decision(h: &Harness, label: &str, score: Option<f64>) {
    let id = h
        .ledger
        .log_decision(decision(AGENT, TYPE, "route to billing").with_version(label, None))
        .unwrap();
    if let Some(value) = score {
        h.ledger
            .record_outcome(NewOutcome::new(id, "human_approval", Some(value), FeedbackSource::Human))
            .unwrap();
    }
}

#[test]
fn winning_test_arm_completes_and_requests_promotion() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    let id = h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();

    for _ in 0..5 {
        scored_decision(&h, "V", Some(95.0));
        scored_decision(&h, "C", Some(10.0));
    }
    let done = h.engine.refresh_metrics(&id).unwrap();

    assert_eq!(done.status, ExperimentStatus::Completed);
    assert_eq!(done.winner, Some(ExperimentWinner::Test));
    assert_eq!(done.current_sample_size, 10);
    assert_eq!(done.metrics.test, ArmMetrics::from_counts(5, 5, 5));
    assert_eq!(done.metrics.control, ArmMetrics::from_counts(5, 5, 0));
    assert!(done.significance.unwrap() >= 0.95);
    assert!(done.ended_at.is_some());

    let queue = h.approval.pending_queue().unwrap();
    assert_eq!(queue.len(), 1);
    let request = &queue[0];
    assert_eq!(request.version_id, test);
    assert_eq!(request.request_type, ApprovalRequestType::ExperimentWinner);
    assert_eq!(request.priority, ApprovalPriority::High);
    assert_eq!(request.experiment_id.as_deref(), Some(id.as_str()));
    assert_eq!(request.risk_assessment, "low (statistically validated)");
}

#[test]
fn control_win_completes_without_request() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    let id = h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();

    for _ in 0..5 {
        scored_decision(&h, "V", Some(5.0));
        scored_decision(&h, "C", Some(90.0));
    }
    let done = h.engine.refresh_metrics(&id).unwrap();

    assert_eq!(done.winner, Some(ExperimentWinner::Control));
    assert!(h.approval.pending_queue().unwrap().is_empty());
}

#[test]
fn below_target_stays_running_with_fresh_counts() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    let id = h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();

    scored_decision(&h, "V", Some(80.0));
    scored_decision(&h, "V", None);
    scored_decision(&h, "C", Some(40.0));
    let refreshed = h.engine.refresh_metrics(&id).unwrap();

    assert_eq!(refreshed.status, ExperimentStatus::Running);
    assert_eq!(refreshed.current_sample_size, 3);
    assert_eq!(refreshed.metrics.test, ArmMetrics::from_counts(2, 1, 1));
    assert_eq!(refreshed.significance, None);
    assert_eq!(refreshed.winner, None);

    let stored = h.engine.get_experiment(&id).unwrap().unwrap();
    assert_eq!(stored.metrics, refreshed.metrics);
}

#[test]
fn decisions_of_other_pairs_and_labels_are_ignored() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    let id = h.engine.create_experiment(experiment(&control, &test, 50, 100)).unwrap();

    h.ledger
        .log_decision(decision(AGENT, "escalation_decision", "escalate").with_version("V", None))
        .unwrap();
    h.ledger
        .log_decision(decision(AGENT, TYPE, "route").with_version("legacy", None))
        .unwrap();
    h.ledger.log_decision(decision(AGENT, TYPE, "route")).unwrap();

    let refreshed = h.engine.refresh_metrics(&id).unwrap();
    assert_eq!(refreshed.current_sample_size, 0);
}

#[test]
fn creation_validates_input() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);

    let mut unnamed = experiment(&control, &test, 50, 10);
    unnamed.name = "  ".to_string();
    for bad in [
        unnamed,
        experiment(&control, &test, 101, 10),
        experiment(&control, &test, 50, 0),
        experiment(&control, &control, 50, 10),
    ] {
        let err = h.engine.create_experiment(bad).unwrap_err();
        assert!(matches!(err, ArbiterError::ValidationFailure { .. }), "{err}");
    }

    let err = h
        .engine
        .create_experiment(experiment(&control, "missing", 50, 10))
        .unwrap_err();
    assert!(matches!(err, ArbiterError::NotFound { entity: "version", .. }));
}

#[test]
fn arms_must_share_the_pair() {
    let h = harness();
    let (control, _) = control_and_candidate(&h);
    let other = h
        .registry
        .create_version(new_version(AGENT, "escalation_decision", "E1"))
        .unwrap();
    let err = h
        .engine
        .create_experiment(experiment(&control, &other, 50, 10))
        .unwrap_err();
    assert!(matches!(err, ArbiterError::ValidationFailure { .. }));
}

#[test]
fn archived_arm_is_rejected() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    // Full promotion of V archives C.
    h.registry.promote(&test, "reviewer", 100).unwrap();

    let err = h
        .engine
        .create_experiment(experiment(&control, &test, 50, 10))
        .unwrap_err();
    assert!(matches!(err, ArbiterError::InvalidState { entity: "version", .. }));
}

#[test]
fn one_running_experiment_per_pair() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();

    let err = h
        .engine
        .create_experiment(experiment(&control, &test, 20, 10))
        .unwrap_err();
    assert!(matches!(err, ArbiterError::InvalidState { entity: "experiment", .. }));
}

#[test]
fn running_experiment_routes_active_version_requests() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();

    let mut saw_test = false;
    let mut saw_control = false;
    for _ in 0..200 {
        let version = h.registry.get_active_version(AGENT, TYPE).unwrap().unwrap();
        if version.id == test {
            saw_test = true;
        } else {
            assert_eq!(version.id, control);
            saw_control = true;
        }
    }
    assert!(saw_test && saw_control);
}

#[test]
fn split_extremes_pin_one_arm() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    let id = h.engine.create_experiment(experiment(&control, &test, 100, 10)).unwrap();
    for _ in 0..50 {
        assert_eq!(h.engine.resolve_traffic_version(&id).unwrap().id, test);
    }
    h.engine.abort(&id, "switch to all-control").unwrap();

    let id = h.engine.create_experiment(experiment(&control, &test, 0, 10)).unwrap();
    for _ in 0..50 {
        assert_eq!(h.engine.resolve_traffic_version(&id).unwrap().id, control);
    }
}

#[test]
fn abort_is_terminal() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    let id = h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();

    let aborted = h.engine.abort(&id, "bad prompt").unwrap();
    assert_eq!(aborted.status, ExperimentStatus::Aborted);
    assert_eq!(aborted.winner, None);

    for err in [
        h.engine.abort(&id, "again").unwrap_err(),
        h.engine.refresh_metrics(&id).unwrap_err(),
        h.engine.resolve_traffic_version(&id).unwrap_err(),
    ] {
        assert!(matches!(err, ArbiterError::InvalidState { .. }), "{err}");
    }

    // Routing falls back to the active version once the experiment ends.
    let version = h.registry.get_active_version(AGENT, TYPE).unwrap().unwrap();
    assert_eq!(version.id, control);

    // And the pair is free for a new experiment.
    h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();
}

#[test]
fn completed_experiment_refuses_refresh() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    let id = h.engine.create_experiment(experiment(&control, &test, 50, 2)).unwrap();
    scored_decision(&h, "V", Some(90.0));
    scored_decision(&h, "C", Some(90.0));

    let done = h.engine.refresh_metrics(&id).unwrap();
    assert_eq!(done.winner, Some(ExperimentWinner::Inconclusive));

    let err = h.engine.refresh_metrics(&id).unwrap_err();
    assert!(matches!(err, ArbiterError::InvalidState { .. }));
}

#[test]
fn unknown_experiment_is_not_found() {
    let h = harness();
    for err in [
        h.engine.refresh_metrics("nope").unwrap_err(),
        h.engine.abort("nope", "x").unwrap_err(),
        h.engine.resolve_traffic_version("nope").unwrap_err(),
    ] {
        assert!(matches!(err, ArbiterError::NotFound { entity: "experiment", .. }));
    }
}

#[test]
fn expired_experiment_concludes_on_next_refresh() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    let started_at = Utc::now() - Duration::days(40);
    let stale = Experiment {
        id: "exp-stale".to_string(),
        name: "stale".to_string(),
        description: None,
        agent_name: AGENT.to_string(),
        decision_type: TYPE.to_string(),
        control_version_id: control,
        test_version_id: test,
        traffic_split: 50,
        target_sample_size: 1_000,
        current_sample_size: 0,
        metrics: ExperimentMetrics::default(),
        significance: None,
        status: ExperimentStatus::Running,
        winner: None,
        started_at,
        ended_at: None,
        expires_at: Some(started_at + Duration::days(30)),
    };
    h.storage.insert_experiment(&stale, "fixture").unwrap();

    // Still routes until concluded.
    h.engine.resolve_traffic_version("exp-stale").unwrap();

    scored_decision(&h, "V", Some(90.0));
    let done = h.engine.refresh_metrics("exp-stale").unwrap();
    assert_eq!(done.status, ExperimentStatus::Completed);
    assert_eq!(done.winner, Some(ExperimentWinner::Inconclusive));
    assert_eq!(done.current_sample_size, 1);
}

#[test]
fn default_lifetime_sets_deadline() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    let id = h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();
    let exp = h.engine.get_experiment(&id).unwrap().unwrap();
    let lifetime = exp.expires_at.unwrap() - exp.started_at;
    assert_eq!(lifetime, Duration::days(30));
}

#[test]
fn oversized_lifetime_is_an_error_not_a_panic() {
    let h = harness_with(ExperimentConfig {
        max_duration_days: 100_000_000,
        ..ExperimentConfig::default()
    });
    let (control, test) = control_and_candidate(&h);
    let err = h
        .engine
        .create_experiment(experiment(&control, &test, 50, 10))
        .unwrap_err();
    assert!(matches!(err, ArbiterError::ConfigError(_)));
    assert!(h.storage.running_experiment_for(AGENT, TYPE).unwrap().is_none());

    // Beyond what a chrono duration can hold: expiry is dropped.
    let h = harness_with(ExperimentConfig {
        max_duration_days: u64::MAX,
        ..ExperimentConfig::default()
    });
    let (control, test) = control_and_candidate(&h);
    let id = h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();
    assert!(h.engine.get_experiment(&id).unwrap().unwrap().expires_at.is_none());
}

#[test]
fn refresh_all_running_covers_every_pair() {
    let h = harness();
    let (control, test) = control_and_candidate(&h);
    h.engine.create_experiment(experiment(&control, &test, 50, 10)).unwrap();

    let esc_control = h
        .registry
        .create_version(
            new_version(AGENT, "escalation_decision", "E1").with_status(VersionStatus::Active, 100),
        )
        .unwrap();
    let esc_test = h
        .registry
        .create_version(new_version(AGENT, "escalation_decision", "E2"))
        .unwrap();
    h.engine
        .create_experiment(experiment(&esc_control, &esc_test, 30, 10))
        .unwrap();

    scored_decision(&h, "V", Some(50.0));
    let refreshed = h.engine.refresh_all_running().unwrap();
    assert_eq!(refreshed.len(), 2);
    assert!(refreshed.iter().all(|e| e.status == ExperimentStatus::Running));
    let routing = refreshed.iter().find(|e| e.decision_type == TYPE).unwrap();
    assert_eq!(routing.current_sample_size, 1);
}

#[test]
fn golden_significance_cases() {
    let cases: Vec<SignificanceCase> = load_fixture("golden/significance_cases.json");
    assert!(!cases.is_empty());
    for case in cases {
        let control = ArmMetrics::from_counts(
            case.control_evaluated,
            case.control_evaluated,
            case.control_successes,
        );
        let test = ArmMetrics::from_counts(case.test_evaluated, case.test_evaluated, case.test_successes);
        let verdict = significance::evaluate(&control, &test, 0.95);

        assert_eq!(verdict.winner.as_str(), case.winner, "{}", case.name);
        if let Some(min) = case.min_significance {
            assert!(verdict.significance >= min, "{}: {}", case.name, verdict.significance);
        }
        if let Some(max) = case.max_significance {
            assert!(verdict.significance <= max, "{}: {}", case.name, verdict.significance);
        }
    }
}
