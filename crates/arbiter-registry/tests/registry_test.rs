//! VersionRegistry lifecycle and active version resolution.

use std::sync::Arc;

use proptest::prelude::*;

use arbiter_core::config::{RegistryConfig, RolloutSelection};
use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{Version, VersionStatus};
use arbiter_core::traits::{ITrafficResolver, IVersionStorage, SeededRandom};
use arbiter_registry::VersionRegistry;
use arbiter_storage::StorageEngine;
use test_fixtures::new_version;

fn registry() -> (Arc<StorageEngine>, VersionRegistry) {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let registry = VersionRegistry::new(storage.clone(), &RegistryConfig::default());
    (storage, registry)
}

/// Always routes to one fixed version.
struct FixedExperiment(Version);

impl ITrafficResolver for FixedExperiment {
    fn resolve(&self, _: &str, _: &str) -> ArbiterResult<Option<Version>> {
        Ok(Some(self.0.clone()))
    }
}

struct BrokenExperiment;

impl ITrafficResolver for BrokenExperiment {
    fn resolve(&self, _: &str, _: &str) -> ArbiterResult<Option<Version>> {
        Err(ArbiterError::not_found("version", "gone"))
    }
}

#[test]
fn new_version_defaults_to_testing() {
    let (_, registry) = registry();
    let id = registry.create_version(new_version("triage", "routing", "v1")).unwrap();
    let version = registry.get_version(&id).unwrap().unwrap();
    assert_eq!(version.status, VersionStatus::Testing);
    assert_eq!(version.rollout_percentage, 0);
    assert!(registry.get_active_version("triage", "routing").unwrap().is_none());
}

#[test]
fn create_rejects_bad_input() {
    let (_, registry) = registry();
    let err = registry.create_version(new_version("triage", "", "v1")).unwrap_err();
    assert!(matches!(err, ArbiterError::ValidationFailure { .. }));
    let err = registry
        .create_version(new_version("triage", "routing", "v1").with_status(VersionStatus::Active, 101))
        .unwrap_err();
    assert!(matches!(err, ArbiterError::ValidationFailure { .. }));
}

#[test]
fn creating_active_full_rollout_archives_previous() {
    let (_, registry) = registry();
    let v1 = registry
        .create_version(new_version("triage", "routing", "v1").with_status(VersionStatus::Active, 100))
        .unwrap();
    let v2 = registry
        .create_version(new_version("triage", "routing", "v2").with_status(VersionStatus::Active, 100))
        .unwrap();

    assert_eq!(registry.get_version(&v1).unwrap().unwrap().status, VersionStatus::Archived);
    let active = registry.get_active_version("triage", "routing").unwrap().unwrap();
    assert_eq!(active.id, v2);
    assert_eq!(active.approved_by.as_deref(), Some("fixture"));
}

#[test]
fn highest_rollout_serves_outside_experiments() {
    let (_, registry) = registry();
    let full = registry.create_version(new_version("triage", "routing", "v1")).unwrap();
    let partial = registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    registry.promote(&full, "alice", 100).unwrap();
    registry.promote(&partial, "alice", 10).unwrap();

    for _ in 0..20 {
        let active = registry.get_active_version("triage", "routing").unwrap().unwrap();
        assert_eq!(active.id, full);
    }
    let view = registry.active_view("triage", "routing").unwrap().unwrap();
    assert_eq!(view.version_label, "v1");
}

#[test]
fn weighted_selection_serves_partial_rollouts() {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let config = RegistryConfig {
        rollout_selection: RolloutSelection::Weighted,
    };
    let registry = VersionRegistry::new(storage, &config).with_random(Arc::new(SeededRandom::new(11)));
    let big = registry.create_version(new_version("triage", "routing", "v1")).unwrap();
    let small = registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    registry.promote(&big, "alice", 70).unwrap();
    registry.promote(&small, "alice", 30).unwrap();

    let draws = 2_000;
    let small_hits = (0..draws)
        .filter(|_| registry.get_active_version("triage", "routing").unwrap().unwrap().id == small)
        .count();
    let fraction = small_hits as f64 / draws as f64;
    assert!((fraction - 0.30).abs() < 0.05, "fraction {fraction}");
}

#[test]
fn running_experiment_takes_precedence() {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let plain = VersionRegistry::new(storage.clone(), &RegistryConfig::default());
    let control = plain
        .create_version(new_version("triage", "routing", "v1").with_status(VersionStatus::Active, 100))
        .unwrap();
    let candidate = plain.create_version(new_version("triage", "routing", "v2")).unwrap();
    let candidate = storage.get_version(&candidate).unwrap().unwrap();

    let routed = VersionRegistry::new(storage.clone(), &RegistryConfig::default())
        .with_traffic_resolver(Arc::new(FixedExperiment(candidate.clone())));
    assert_eq!(
        routed.get_active_version("triage", "routing").unwrap().unwrap().id,
        candidate.id
    );

    let broken = VersionRegistry::new(storage, &RegistryConfig::default())
        .with_traffic_resolver(Arc::new(BrokenExperiment));
    assert_eq!(
        broken.get_active_version("triage", "routing").unwrap().unwrap().id,
        control
    );
}

#[test]
fn promote_rejects_invalid_targets() {
    let (_, registry) = registry();
    let id = registry.create_version(new_version("triage", "routing", "v1")).unwrap();
    assert!(matches!(
        registry.promote(&id, "alice", 150).unwrap_err(),
        ArbiterError::ValidationFailure { .. }
    ));
    assert!(matches!(
        registry.promote("missing", "alice", 50).unwrap_err(),
        ArbiterError::NotFound { .. }
    ));
    let rejected = registry
        .create_version(new_version("triage", "routing", "v2").with_status(VersionStatus::Rejected, 0))
        .unwrap();
    assert!(matches!(
        registry.promote(&rejected, "alice", 100).unwrap_err(),
        ArbiterError::InvalidState { .. }
    ));
}

#[test]
fn content_hash_finds_existing_config() {
    let (_, registry) = registry();
    let id = registry.create_version(new_version("triage", "routing", "v1")).unwrap();
    let hash = registry.get_version(&id).unwrap().unwrap().content_hash;
    let found = registry.find_by_content_hash("triage", "routing", &hash).unwrap();
    assert_eq!(found.map(|v| v.id), Some(id));
    assert_eq!(registry.list_versions("triage", "routing").unwrap().len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn at_most_one_full_rollout_after_any_promotions(
        ops in proptest::collection::vec((0usize..4, prop_oneof![Just(100u8), 0u8..100]), 1..12)
    ) {
        let (storage, registry) = registry();
        let ids: Vec<String> = (0..4)
            .map(|i| registry.create_version(new_version("triage", "routing", &format!("v{i}"))).unwrap())
            .collect();
        for (idx, rollout) in ops {
            // Archived versions refuse promotion; that is fine here.
            let _ = registry.promote(&ids[idx], "alice", rollout);
            let full = storage
                .active_versions("triage", "routing")
                .unwrap()
                .iter()
                .filter(|v| v.rollout_percentage == 100)
                .count();
            prop_assert!(full <= 1);
        }
    }
}
