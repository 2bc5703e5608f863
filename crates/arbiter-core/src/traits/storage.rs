use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::ArbiterResult;
use crate::models::{
    ApprovalRequest, AuditEntry, AuditOperation, Decision, DecisionQuery,
    DecisionRecord, Experiment, LearningInsight, Outcome, PerformanceSnapshot, Version,
};

/// Append-only decision ledger persistence.
pub trait IDecisionStorage: Send + Sync {
    fn insert_decision(&self, decision: &Decision) -> ArbiterResult<()>;
    /// Fails with `NotFound` when `outcome.decision_id` does not exist.
    fn insert_outcome(&self, outcome: &Outcome) -> ArbiterResult<()>;
    fn get_decision(&self, id: &str) -> ArbiterResult<Option<DecisionRecord>>;
    /// Decisions matching the filter with their outcomes, oldest first.
    fn query_decisions(&self, query: &DecisionQuery) -> ArbiterResult<Vec<DecisionRecord>>;
}

/// Version registry persistence.
pub trait IVersionStorage: Send + Sync {
    fn insert_version(&self, version: &Version, actor: &str) -> ArbiterResult<()>;
    fn get_version(&self, id: &str) -> ArbiterResult<Option<Version>>;
    /// All versions for the pair, newest first.
    fn list_versions(&self, agent_name: &str, decision_type: &str) -> ArbiterResult<Vec<Version>>;
    /// Active versions for the pair, highest rollout first, newest first on ties.
    fn active_versions(&self, agent_name: &str, decision_type: &str)
        -> ArbiterResult<Vec<Version>>;
    /// Set `active` + rollout on one version. With a full rollout every other
    /// active version of the pair is archived in the same transaction.
    fn promote_version(
        &self,
        id: &str,
        approver: &str,
        rollout_percentage: u8,
        approved_at: DateTime<Utc>,
    ) -> ArbiterResult<Version>;
    fn find_by_content_hash(
        &self,
        agent_name: &str,
        decision_type: &str,
        content_hash: &str,
    ) -> ArbiterResult<Option<Version>>;
    fn count_active_versions(&self, agent_name: &str) -> ArbiterResult<u64>;
}

/// Experiment persistence.
pub trait IExperimentStorage: Send + Sync {
    fn insert_experiment(&self, experiment: &Experiment, actor: &str) -> ArbiterResult<()>;
    fn get_experiment(&self, id: &str) -> ArbiterResult<Option<Experiment>>;
    fn running_experiment_for(
        &self,
        agent_name: &str,
        decision_type: &str,
    ) -> ArbiterResult<Option<Experiment>>;
    fn running_experiments(&self) -> ArbiterResult<Vec<Experiment>>;
    /// Persist metrics and status. Only a `running` row is updated; returns
    /// false when the row was already terminal.
    fn update_experiment(&self, experiment: &Experiment, actor: &str) -> ArbiterResult<bool>;
    fn count_running_experiments(&self, agent_name: &str) -> ArbiterResult<u64>;
}

/// Approval queue persistence.
pub trait IApprovalStorage: Send + Sync {
    fn insert_request(&self, request: &ApprovalRequest) -> ArbiterResult<()>;
    fn get_request(&self, id: &str) -> ArbiterResult<Option<ApprovalRequest>>;
    /// Compare-and-swap: writes `request` only if the stored status and
    /// applied rollout still equal those of `expected`, auditing the change
    /// as `operation`. Returns whether the row changed.
    fn update_request_if(
        &self,
        request: &ApprovalRequest,
        expected: &ApprovalRequest,
        operation: AuditOperation,
        actor: &str,
    ) -> ArbiterResult<bool>;
    /// Pending requests, highest priority first, oldest first within a priority.
    fn pending_requests(&self) -> ArbiterResult<Vec<ApprovalRequest>>;
}

/// Insight and snapshot persistence.
pub trait IInsightStorage: Send + Sync {
    fn insert_insight(&self, insight: &LearningInsight) -> ArbiterResult<()>;
    fn get_insight(&self, id: &str) -> ArbiterResult<Option<LearningInsight>>;
    /// Insert or replace the row keyed by (agent_name, snapshot_date).
    fn upsert_snapshot(&self, snapshot: &PerformanceSnapshot) -> ArbiterResult<()>;
    fn get_snapshot(
        &self,
        agent_name: &str,
        date: NaiveDate,
    ) -> ArbiterResult<Option<PerformanceSnapshot>>;
    fn list_snapshots(&self, agent_name: &str) -> ArbiterResult<Vec<PerformanceSnapshot>>;
}

/// Read access to the audit trail.
pub trait IAuditStorage: Send + Sync {
    fn audit_trail(&self, entity_id: &str) -> ArbiterResult<Vec<AuditEntry>>;
}

/// Everything the engines need from one backing store.
pub trait IArbiterStorage:
    IDecisionStorage
    + IVersionStorage
    + IExperimentStorage
    + IApprovalStorage
    + IInsightStorage
    + IAuditStorage
{
}

impl<T> IArbiterStorage for T where
    T: IDecisionStorage
        + IVersionStorage
        + IExperimentStorage
        + IApprovalStorage
        + IInsightStorage
        + IAuditStorage
{
}
