//! ApprovalWorkflow: screening, review tasks, approve/reject transitions,
//! compensation when promotion fails.

use std::sync::Arc;

use proptest::prelude::*;

use arbiter_approval::ApprovalWorkflow;
use arbiter_core::config::{ApprovalConfig, RegistryConfig};
use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{
    ApprovalPriority, ApprovalRequestType, ApprovalStatus, AuditOperation, NewApprovalRequest,
    ReviewTask, VersionStatus,
};
use arbiter_core::traits::{IAuditStorage, IReviewQueue};
use arbiter_registry::VersionRegistry;
use arbiter_storage::StorageEngine;
use test_fixtures::{approval_request, new_version};

struct Harness {
    storage: Arc<StorageEngine>,
    registry: Arc<VersionRegistry>,
    workflow: ApprovalWorkflow,
}

fn harness() -> Harness {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let registry = Arc::new(VersionRegistry::new(storage.clone(), &RegistryConfig::default()));
    let workflow = ApprovalWorkflow::new(
        storage.clone(),
        registry.clone(),
        storage.clone(),
        &ApprovalConfig::default(),
    )
    .unwrap();
    Harness {
        storage,
        registry,
        workflow,
    }
}

struct ClosedQueue;

impl IReviewQueue for ClosedQueue {
    fn create_task(&self, _: &ReviewTask) -> ArbiterResult<()> {
        Err(ArbiterError::external("review_queue", "service unavailable"))
    }
    fn open_tasks(&self) -> ArbiterResult<Vec<ReviewTask>> {
        Ok(Vec::new())
    }
}

#[test]
fn submit_requires_existing_version() {
    let h = harness();
    let err = h
        .workflow
        .submit(approval_request("missing", "new prompt"))
        .unwrap_err();
    assert!(matches!(err, ArbiterError::NotFound { entity: "version", .. }));
}

#[test]
fn plain_request_keeps_caller_priority_and_opens_task() {
    let h = harness();
    let v = h.registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    let id = h.workflow.submit(approval_request(&v, "shorter routing prompt")).unwrap();

    let request = h.workflow.get(&id).unwrap().unwrap();
    assert_eq!(request.priority, ApprovalPriority::Medium);
    assert!(!request.requires_human_review);
    assert_eq!(request.status, ApprovalStatus::Pending);

    let tasks = h.storage.tasks_for_request(&id).unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(!tasks[0].escalated);
}

#[test]
fn sensitive_type_forces_high_priority() {
    let h = harness();
    let v = h
        .registry
        .create_version(new_version("support", "escalation_decision", "v2"))
        .unwrap();
    let mut new = approval_request(&v, "tweak wording");
    new.priority = ApprovalPriority::Low;
    let id = h.workflow.submit(new).unwrap();

    let request = h.workflow.get(&id).unwrap().unwrap();
    assert_eq!(request.priority, ApprovalPriority::High);
    assert!(request.requires_human_review);
    assert!(h.storage.tasks_for_request(&id).unwrap()[0].escalated);
}

#[test]
fn sensitive_keyword_in_summary_forces_review() {
    let h = harness();
    let v = h.registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    let id = h
        .workflow
        .submit(approval_request(&v, "Offer a Refund before routing"))
        .unwrap();
    let request = h.workflow.get(&id).unwrap().unwrap();
    assert_eq!(request.priority, ApprovalPriority::High);
    assert!(request.requires_human_review);
}

#[test]
fn review_queue_failure_leaves_request_pending() {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let registry = Arc::new(VersionRegistry::new(storage.clone(), &RegistryConfig::default()));
    let workflow = ApprovalWorkflow::new(
        storage.clone(),
        registry.clone(),
        Arc::new(ClosedQueue),
        &ApprovalConfig::default(),
    )
    .unwrap();
    let v = registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    let id = workflow.submit(approval_request(&v, "change")).unwrap();
    assert_eq!(workflow.pending_queue().unwrap().len(), 1);
    assert!(storage.tasks_for_request(&id).unwrap().is_empty());
}

#[test]
fn approve_promotes_and_archives_previous() {
    let h = harness();
    let old = h
        .registry
        .create_version(new_version("triage", "routing", "v1").with_status(VersionStatus::Active, 100))
        .unwrap();
    let v = h.registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    let id = h.workflow.submit(approval_request(&v, "better prompt")).unwrap();

    let approved = h
        .workflow
        .approve(&id, "alice", Some("looks good".into()), None)
        .unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(approved.approved_rollout, Some(100));

    let promoted = h.registry.get_version(&v).unwrap().unwrap();
    assert_eq!(promoted.status, VersionStatus::Active);
    assert_eq!(promoted.approved_by.as_deref(), Some("alice"));
    let archived = h.registry.get_version(&old).unwrap().unwrap();
    assert_eq!(archived.status, VersionStatus::Archived);
    assert!(h.workflow.pending_queue().unwrap().is_empty());
}

#[test]
fn graduated_rollout_requires_increase() {
    let h = harness();
    let v = h.registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    let id = h.workflow.submit(approval_request(&v, "canary")).unwrap();

    h.workflow.approve(&id, "alice", None, Some(10)).unwrap();
    assert_eq!(h.registry.get_version(&v).unwrap().unwrap().rollout_percentage, 10);

    let err = h.workflow.approve(&id, "alice", None, Some(10)).unwrap_err();
    assert!(matches!(err, ArbiterError::InvalidState { .. }));

    h.workflow.approve(&id, "bob", None, Some(50)).unwrap();
    assert_eq!(h.registry.get_version(&v).unwrap().unwrap().rollout_percentage, 50);
    assert_eq!(
        h.workflow.get(&id).unwrap().unwrap().reviewed_by.as_deref(),
        Some("bob")
    );
}

#[test]
fn reject_leaves_version_testing() {
    let h = harness();
    let v = h.registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    let id = h.workflow.submit(approval_request(&v, "risky")).unwrap();

    let rejected = h.workflow.reject(&id, "alice", Some("no".into())).unwrap();
    assert_eq!(rejected.status, ApprovalStatus::Rejected);
    assert_eq!(
        h.registry.get_version(&v).unwrap().unwrap().status,
        VersionStatus::Testing
    );

    assert!(matches!(
        h.workflow.approve(&id, "alice", None, None).unwrap_err(),
        ArbiterError::InvalidState { .. }
    ));
    assert!(matches!(
        h.workflow.reject(&id, "alice", None).unwrap_err(),
        ArbiterError::InvalidState { .. }
    ));
}

#[test]
fn failed_promotion_rolls_request_back() {
    let h = harness();
    let v1 = h.registry.create_version(new_version("triage", "routing", "v1")).unwrap();
    let v2 = h.registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    let id = h.workflow.submit(approval_request(&v1, "first")).unwrap();

    // v1 is archived by a full rollout of v2 while its request waits.
    h.registry.promote(&v1, "alice", 100).unwrap();
    h.registry.promote(&v2, "alice", 100).unwrap();

    let err = h.workflow.approve(&id, "bob", None, None).unwrap_err();
    assert!(matches!(err, ArbiterError::InvalidState { .. }));

    let request = h.workflow.get(&id).unwrap().unwrap();
    assert_eq!(request.status, ApprovalStatus::Pending);
    assert_eq!(request.approved_rollout, None);

    let ops: Vec<_> = h
        .storage
        .audit_trail(&id)
        .unwrap()
        .iter()
        .map(|e| e.operation)
        .collect();
    assert_eq!(
        ops,
        vec![AuditOperation::Submit, AuditOperation::Approve, AuditOperation::Rollback]
    );
}

#[test]
fn rollout_above_hundred_is_rejected() {
    let h = harness();
    let v = h.registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    let id = h.workflow.submit(approval_request(&v, "x")).unwrap();
    assert!(matches!(
        h.workflow.approve(&id, "alice", None, Some(120)).unwrap_err(),
        ArbiterError::ValidationFailure { .. }
    ));
    assert_eq!(h.workflow.get(&id).unwrap().unwrap().status, ApprovalStatus::Pending);
}

#[test]
fn pending_queue_is_priority_ordered() {
    let h = harness();
    let v = h.registry.create_version(new_version("triage", "routing", "v2")).unwrap();
    let mut low = approval_request(&v, "low");
    low.priority = ApprovalPriority::Low;
    let low = h.workflow.submit(low).unwrap();
    let mut winner = approval_request(&v, "winner");
    winner.priority = ApprovalPriority::High;
    winner.request_type = ApprovalRequestType::ExperimentWinner;
    let winner = h.workflow.submit(winner).unwrap();

    let queue: Vec<_> = h
        .workflow
        .pending_queue()
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(queue, vec![winner, low]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sensitive_type_always_escalates(
        priority in prop_oneof![
            Just(ApprovalPriority::Low),
            Just(ApprovalPriority::Medium),
            Just(ApprovalPriority::High),
        ],
        summary in "[a-z ]{0,40}",
    ) {
        let h = harness();
        let v = h
            .registry
            .create_version(new_version("support", "escalation_decision", "v1"))
            .unwrap();
        let mut new: NewApprovalRequest = approval_request(&v, &summary);
        new.priority = priority;
        let id = h.workflow.submit(new).unwrap();
        let request = h.workflow.get(&id).unwrap().unwrap();
        prop_assert_eq!(request.priority, ApprovalPriority::High);
        prop_assert!(request.requires_human_review);
    }
}
