//! File-backed engine: WAL, read pool visibility, reopen.

use chrono::Utc;
use arbiter_core::models::NewDecision;
use arbiter_core::traits::IDecisionStorage;
use arbiter_storage::migrations::LATEST_VERSION;
use arbiter_storage::StorageEngine;

#[test]
fn reads_through_pool_see_committed_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arbiter.db");
    let storage = StorageEngine::open(&path, 2).unwrap();
    assert!(storage.wal_enabled().unwrap());
    assert_eq!(storage.schema_version().unwrap(), LATEST_VERSION);

    for i in 0..5 {
        let decision = NewDecision::new("triage", "routing", format!("d{i}"), "r")
            .into_decision(uuid::Uuid::new_v4().to_string(), Utc::now());
        storage.insert_decision(&decision).unwrap();
        assert!(storage.get_decision(&decision.id).unwrap().is_some());
    }
    assert_eq!(storage.count_decisions().unwrap(), 5);
}

#[test]
fn reopen_keeps_data_and_skips_applied_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arbiter.db");
    let id = uuid::Uuid::new_v4().to_string();
    {
        let storage = StorageEngine::open(&path, 1).unwrap();
        let decision = NewDecision::new("triage", "routing", "d", "r").into_decision(id.clone(), Utc::now());
        storage.insert_decision(&decision).unwrap();
    }
    let storage = StorageEngine::open(&path, 1).unwrap();
    assert_eq!(storage.schema_version().unwrap(), LATEST_VERSION);
    assert!(storage.get_decision(&id).unwrap().is_some());
}
