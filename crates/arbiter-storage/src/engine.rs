//! StorageEngine: owns the ConnectionPool and implements every storage trait
//! plus the built-in review queue.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};

use arbiter_core::errors::ArbiterResult;
use arbiter_core::models::{
    ApprovalRequest, AuditEntity, AuditEntry, AuditOperation, Decision,
    DecisionQuery, DecisionRecord, Experiment, LearningInsight, Outcome, PerformanceSnapshot,
    ReviewTask, Version,
};
use arbiter_core::traits::{
    IApprovalStorage, IAuditStorage, IDecisionStorage, IExperimentStorage, IInsightStorage,
    IReviewQueue, IVersionStorage,
};

use crate::audit::AuditLogger;
use crate::migrations;
use crate::pool::{pragmas, ConnectionPool};
use crate::queries::{
    approval_ops, audit_ops, decision_ops, experiment_ops, insight_ops, review_ops,
    snapshot_ops, version_ops,
};
use crate::to_storage_err;

/// The main storage engine.
pub struct StorageEngine {
    pool: ConnectionPool,
}

impl StorageEngine {
    /// Open a storage engine backed by a file on disk.
    pub fn open(path: &Path, read_pool_size: usize) -> ArbiterResult<Self> {
        let pool = ConnectionPool::open(path, read_pool_size)?;
        let engine = Self { pool };
        engine.initialize()?;
        Ok(engine)
    }

    /// Open an in-memory storage engine (for testing). Reads go through the
    /// writer since a second in-memory connection is a separate database.
    pub fn open_in_memory() -> ArbiterResult<Self> {
        let pool = ConnectionPool::open_in_memory()?;
        let engine = Self { pool };
        engine.initialize()?;
        Ok(engine)
    }

    fn initialize(&self) -> ArbiterResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            let version = migrations::run_migrations(conn)?;
            tracing::debug!(schema_version = version, "storage initialized");
            Ok(())
        })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn with_reader<F, T>(&self, f: F) -> ArbiterResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> ArbiterResult<T>,
    {
        match &self.pool.readers {
            Some(readers) => readers.with_conn(f),
            None => self.pool.writer.with_conn_sync(f),
        }
    }

    fn with_writer<F, T>(&self, f: F) -> ArbiterResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> ArbiterResult<T>,
    {
        self.pool.writer.with_conn_sync(f)
    }

    /// Applied schema version.
    pub fn schema_version(&self) -> ArbiterResult<u32> {
        self.with_reader(migrations::current_version)
    }

    /// Whether the writer runs in WAL mode (always false in memory).
    pub fn wal_enabled(&self) -> ArbiterResult<bool> {
        self.with_writer(pragmas::verify_wal_mode)
    }

    pub fn count_decisions(&self) -> ArbiterResult<u64> {
        self.with_reader(decision_ops::count_decisions)
    }

    pub fn pending_request_count(&self) -> ArbiterResult<u64> {
        Ok(self.with_reader(approval_ops::pending_requests)?.len() as u64)
    }

    pub fn total_running_experiments(&self) -> ArbiterResult<u64> {
        Ok(self.with_reader(experiment_ops::running_experiments)?.len() as u64)
    }

    pub fn tasks_for_request(&self, request_id: &str) -> ArbiterResult<Vec<ReviewTask>> {
        self.with_reader(|conn| review_ops::tasks_for_request(conn, request_id))
    }

    pub fn recent_insights(&self, agent_name: &str, limit: usize) -> ArbiterResult<Vec<LearningInsight>> {
        self.with_reader(|conn| insight_ops::recent_insights(conn, agent_name, limit))
    }
}

impl IDecisionStorage for StorageEngine {
    fn insert_decision(&self, decision: &Decision) -> ArbiterResult<()> {
        self.with_writer(|conn| decision_ops::insert_decision(conn, decision))
    }

    fn insert_outcome(&self, outcome: &Outcome) -> ArbiterResult<()> {
        self.with_writer(|conn| decision_ops::insert_outcome(conn, outcome))
    }

    fn get_decision(&self, id: &str) -> ArbiterResult<Option<DecisionRecord>> {
        self.with_reader(|conn| decision_ops::get_decision(conn, id))
    }

    fn query_decisions(&self, query: &DecisionQuery) -> ArbiterResult<Vec<DecisionRecord>> {
        self.with_reader(|conn| decision_ops::query_decisions(conn, query))
    }
}

impl IVersionStorage for StorageEngine {
    fn insert_version(&self, version: &Version, actor: &str) -> ArbiterResult<()> {
        self.with_writer(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| to_storage_err(e.to_string()))?;
            version_ops::insert_version(&tx, version)?;
            AuditLogger::log_create(&tx, AuditEntity::Version, &version.id, actor)?;
            tx.commit().map_err(|e| to_storage_err(e.to_string()))
        })
    }

    fn get_version(&self, id: &str) -> ArbiterResult<Option<Version>> {
        self.with_reader(|conn| version_ops::get_version(conn, id))
    }

    fn list_versions(&self, agent_name: &str, decision_type: &str) -> ArbiterResult<Vec<Version>> {
        self.with_reader(|conn| version_ops::list_versions(conn, agent_name, decision_type))
    }

    fn active_versions(
        &self,
        agent_name: &str,
        decision_type: &str,
    ) -> ArbiterResult<Vec<Version>> {
        self.with_reader(|conn| version_ops::active_versions(conn, agent_name, decision_type))
    }

    fn promote_version(
        &self,
        id: &str,
        approver: &str,
        rollout_percentage: u8,
        approved_at: DateTime<Utc>,
    ) -> ArbiterResult<Version> {
        self.with_writer(|conn| {
            version_ops::promote_version(conn, id, approver, rollout_percentage, approved_at)
        })
    }

    fn find_by_content_hash(
        &self,
        agent_name: &str,
        decision_type: &str,
        content_hash: &str,
    ) -> ArbiterResult<Option<Version>> {
        self.with_reader(|conn| {
            version_ops::find_by_content_hash(conn, agent_name, decision_type, content_hash)
        })
    }

    fn count_active_versions(&self, agent_name: &str) -> ArbiterResult<u64> {
        self.with_reader(|conn| version_ops::count_active_versions(conn, agent_name))
    }
}

impl IExperimentStorage for StorageEngine {
    fn insert_experiment(&self, experiment: &Experiment, actor: &str) -> ArbiterResult<()> {
        self.with_writer(|conn| experiment_ops::insert_experiment(conn, experiment, actor))
    }

    fn get_experiment(&self, id: &str) -> ArbiterResult<Option<Experiment>> {
        self.with_reader(|conn| experiment_ops::get_experiment(conn, id))
    }

    fn running_experiment_for(
        &self,
        agent_name: &str,
        decision_type: &str,
    ) -> ArbiterResult<Option<Experiment>> {
        self.with_reader(|conn| {
            experiment_ops::running_experiment_for(conn, agent_name, decision_type)
        })
    }

    fn running_experiments(&self) -> ArbiterResult<Vec<Experiment>> {
        self.with_reader(experiment_ops::running_experiments)
    }

    fn update_experiment(&self, experiment: &Experiment, actor: &str) -> ArbiterResult<bool> {
        self.with_writer(|conn| experiment_ops::update_experiment(conn, experiment, actor))
    }

    fn count_running_experiments(&self, agent_name: &str) -> ArbiterResult<u64> {
        self.with_reader(|conn| experiment_ops::count_running_experiments(conn, agent_name))
    }
}

impl IApprovalStorage for StorageEngine {
    fn insert_request(&self, request: &ApprovalRequest) -> ArbiterResult<()> {
        self.with_writer(|conn| approval_ops::insert_request(conn, request))
    }

    fn get_request(&self, id: &str) -> ArbiterResult<Option<ApprovalRequest>> {
        self.with_reader(|conn| approval_ops::get_request(conn, id))
    }

    fn update_request_if(
        &self,
        request: &ApprovalRequest,
        expected: &ApprovalRequest,
        operation: AuditOperation,
        actor: &str,
    ) -> ArbiterResult<bool> {
        self.with_writer(|conn| {
            approval_ops::update_request_if(conn, request, expected, operation, actor)
        })
    }

    fn pending_requests(&self) -> ArbiterResult<Vec<ApprovalRequest>> {
        self.with_reader(approval_ops::pending_requests)
    }
}

impl IInsightStorage for StorageEngine {
    fn insert_insight(&self, insight: &LearningInsight) -> ArbiterResult<()> {
        self.with_writer(|conn| insight_ops::insert_insight(conn, insight))
    }

    fn get_insight(&self, id: &str) -> ArbiterResult<Option<LearningInsight>> {
        self.with_reader(|conn| insight_ops::get_insight(conn, id))
    }

    fn upsert_snapshot(&self, snapshot: &PerformanceSnapshot) -> ArbiterResult<()> {
        self.with_writer(|conn| snapshot_ops::upsert_snapshot(conn, snapshot))
    }

    fn get_snapshot(
        &self,
        agent_name: &str,
        date: NaiveDate,
    ) -> ArbiterResult<Option<PerformanceSnapshot>> {
        self.with_reader(|conn| snapshot_ops::get_snapshot(conn, agent_name, date))
    }

    fn list_snapshots(&self, agent_name: &str) -> ArbiterResult<Vec<PerformanceSnapshot>> {
        self.with_reader(|conn| snapshot_ops::list_snapshots(conn, agent_name))
    }
}

impl IAuditStorage for StorageEngine {
    fn audit_trail(&self, entity_id: &str) -> ArbiterResult<Vec<AuditEntry>> {
        self.with_reader(|conn| audit_ops::entries_for(conn, entity_id))
    }
}

impl IReviewQueue for StorageEngine {
    fn create_task(&self, task: &ReviewTask) -> ArbiterResult<()> {
        self.with_writer(|conn| review_ops::insert_task(conn, task))
    }

    fn open_tasks(&self) -> ArbiterResult<Vec<ReviewTask>> {
        self.with_reader(review_ops::open_tasks)
    }
}
