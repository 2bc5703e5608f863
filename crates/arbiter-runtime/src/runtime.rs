//! ArbiterRuntime: owns storage and every engine, shares them through `Arc`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use arbiter_approval::ApprovalWorkflow;
use arbiter_core::config::ArbiterConfig;
use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{
    ActiveVersionView, Experiment, LearningInsight, NewDecision, NewOutcome, PerformanceSnapshot,
};
use arbiter_core::traits::{
    IInsightGenerator, IReviewQueue, NoOpInsightGenerator, RandomSource, ThreadRandom,
};
use arbiter_experiments::{ExperimentEngine, TrafficAllocator};
use arbiter_insights::InsightAggregator;
use arbiter_ledger::DecisionLedger;
use arbiter_observability::{HealthReport, HealthReporter, HealthSnapshot};
use arbiter_registry::VersionRegistry;
use arbiter_storage::migrations::LATEST_VERSION;
use arbiter_storage::StorageEngine;

/// Options for building the runtime.
#[derive(Default)]
pub struct RuntimeOptions {
    /// SQLite database path. Falls back to `storage.db_path` from the
    /// config, then to an in-memory database.
    pub db_path: Option<PathBuf>,
    /// TOML configuration. Defaults apply when `None`.
    pub config_toml: Option<String>,
    /// External analysis dependency. No-op when `None`.
    pub insight_generator: Option<Arc<dyn IInsightGenerator>>,
    /// Human-review surface. The `review_tasks` table when `None`.
    pub review_queue: Option<Arc<dyn IReviewQueue>>,
    /// Source of traffic and rollout draws. Thread RNG when `None`.
    pub random: Option<Arc<dyn RandomSource>>,
    /// Install the global tracing subscriber from the observability config.
    pub init_tracing: bool,
}

/// The central runtime owning every engine. Cheap to clone.
#[derive(Clone)]
pub struct ArbiterRuntime {
    pub storage: Arc<StorageEngine>,
    pub ledger: DecisionLedger,
    pub registry: Arc<VersionRegistry>,
    pub approval: Arc<ApprovalWorkflow>,
    pub experiments: Arc<ExperimentEngine>,
    pub insights: Arc<InsightAggregator>,
    pub config: Arc<ArbiterConfig>,
    file_backed: bool,
}

impl ArbiterRuntime {
    /// Build the runtime. Opening storage takes the write lock, so call this
    /// outside async context or use [`ArbiterRuntime::open`].
    pub fn new(opts: RuntimeOptions) -> ArbiterResult<Self> {
        let config = match &opts.config_toml {
            Some(toml_str) => ArbiterConfig::load(toml_str)?,
            None => ArbiterConfig::default(),
        };
        if opts.init_tracing {
            arbiter_observability::init_tracing(&config.observability);
        }

        let db_path = opts.db_path.clone().or_else(|| {
            (!config.storage.db_path.is_empty()).then(|| PathBuf::from(&config.storage.db_path))
        });
        let storage = Arc::new(match &db_path {
            Some(path) => StorageEngine::open(path, config.storage.read_pool_size)?,
            None => StorageEngine::open_in_memory()?,
        });

        let random = opts.random.unwrap_or_else(|| Arc::new(ThreadRandom));
        let allocator = Arc::new(TrafficAllocator::new(
            storage.clone(),
            storage.clone(),
            random.clone(),
        ));
        let registry = Arc::new(
            VersionRegistry::new(storage.clone(), &config.registry)
                .with_traffic_resolver(allocator.clone())
                .with_random(random),
        );

        let review_queue: Arc<dyn IReviewQueue> = match opts.review_queue {
            Some(queue) => queue,
            None => storage.clone(),
        };
        let approval = Arc::new(ApprovalWorkflow::new(
            storage.clone(),
            registry.clone(),
            review_queue,
            &config.approval,
        )?);

        let ledger = DecisionLedger::new(storage.clone());
        let experiments = Arc::new(ExperimentEngine::new(
            storage.clone(),
            storage.clone(),
            registry.clone(),
            allocator,
            approval.clone(),
            config.experiments.clone(),
        ));

        let generator = opts
            .insight_generator
            .unwrap_or_else(|| Arc::new(NoOpInsightGenerator));
        let insights = Arc::new(InsightAggregator::new(
            ledger.clone(),
            storage.clone(),
            storage.clone(),
            registry.clone(),
            approval.clone(),
            generator,
            config.insights.clone(),
            config.experiments.success_threshold,
        ));

        info!(
            file_backed = db_path.is_some(),
            selection = ?config.registry.rollout_selection,
            "arbiter runtime ready"
        );
        Ok(Self {
            storage,
            ledger,
            registry,
            approval,
            experiments,
            insights,
            config: Arc::new(config),
            file_backed: db_path.is_some(),
        })
    }

    /// Async constructor: builds the runtime on the blocking pool.
    pub async fn open(opts: RuntimeOptions) -> ArbiterResult<Self> {
        blocking(move || Self::new(opts)).await
    }

    /// Run any synchronous engine call on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> ArbiterResult<T>
    where
        F: FnOnce(&ArbiterRuntime) -> ArbiterResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let runtime = self.clone();
        blocking(move || f(&runtime)).await
    }

    // --- Agent-facing surface ---

    /// Log a decision from the agent's critical path. Ledger failures are
    /// reported through tracing and come back as `None`, never as an error.
    pub async fn log_decision(&self, decision: NewDecision) -> Option<String> {
        self.log_decision_detached(decision).await.unwrap_or_else(|e| {
            warn!(error = %e, "decision write task failed");
            None
        })
    }

    /// Strict variant for callers that must know whether the write landed.
    pub async fn try_log_decision(&self, decision: NewDecision) -> ArbiterResult<String> {
        let ledger = self.ledger.clone();
        blocking(move || ledger.log_decision(decision)).await
    }

    /// Fire-and-forget ledger write. The handle resolves to the id, or
    /// `None` when the write failed (already logged).
    pub fn log_decision_detached(&self, decision: NewDecision) -> JoinHandle<Option<String>> {
        let ledger = self.ledger.clone();
        tokio::task::spawn_blocking(move || ledger.log_decision_best_effort(decision))
    }

    pub async fn record_outcome(&self, outcome: NewOutcome) -> ArbiterResult<String> {
        let ledger = self.ledger.clone();
        blocking(move || ledger.record_outcome(outcome)).await
    }

    pub fn record_outcome_detached(&self, outcome: NewOutcome) -> JoinHandle<Option<String>> {
        let ledger = self.ledger.clone();
        tokio::task::spawn_blocking(move || ledger.record_outcome_best_effort(outcome))
    }

    pub async fn get_active_version(
        &self,
        agent_name: &str,
        decision_type: &str,
    ) -> ArbiterResult<Option<ActiveVersionView>> {
        let registry = self.registry.clone();
        let (agent_name, decision_type) = (agent_name.to_string(), decision_type.to_string());
        blocking(move || registry.active_view(&agent_name, &decision_type)).await
    }

    // --- Scheduler-facing surface ---

    pub async fn analyze(
        &self,
        agent_name: &str,
        decision_type: Option<&str>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> ArbiterResult<LearningInsight> {
        let insights = self.insights.clone();
        let agent_name = agent_name.to_string();
        let decision_type = decision_type.map(str::to_string);
        blocking(move || {
            insights.analyze(&agent_name, decision_type.as_deref(), period_start, period_end)
        })
        .await
    }

    pub async fn snapshot(
        &self,
        agent_name: &str,
        date: NaiveDate,
    ) -> ArbiterResult<Option<PerformanceSnapshot>> {
        let insights = self.insights.clone();
        let agent_name = agent_name.to_string();
        blocking(move || insights.snapshot(&agent_name, date)).await
    }

    pub async fn refresh_metrics(&self, experiment_id: &str) -> ArbiterResult<Experiment> {
        let experiments = self.experiments.clone();
        let experiment_id = experiment_id.to_string();
        blocking(move || experiments.refresh_metrics(&experiment_id)).await
    }

    pub async fn refresh_all_running(&self) -> ArbiterResult<Vec<Experiment>> {
        let experiments = self.experiments.clone();
        blocking(move || experiments.refresh_all_running()).await
    }

    pub async fn recent_insights(
        &self,
        agent_name: &str,
        limit: usize,
    ) -> ArbiterResult<Vec<LearningInsight>> {
        let storage = self.storage.clone();
        let agent_name = agent_name.to_string();
        blocking(move || storage.recent_insights(&agent_name, limit)).await
    }

    // --- Health ---

    pub async fn health(&self) -> ArbiterResult<HealthReport> {
        let storage = self.storage.clone();
        let file_backed = self.file_backed;
        blocking(move || {
            let snapshot = HealthSnapshot {
                schema_version: storage.schema_version()?,
                expected_schema_version: LATEST_VERSION,
                wal_enabled: storage.wal_enabled()?,
                file_backed,
                decisions_logged: storage.count_decisions()?,
                pending_approvals: storage.pending_request_count()?,
                running_experiments: storage.total_running_experiments()?,
                open_review_tasks: IReviewQueue::open_tasks(storage.as_ref())?.len() as u64,
            };
            Ok(HealthReporter::build(&snapshot))
        })
        .await
    }
}

/// Run a synchronous engine call on the blocking pool.
async fn blocking<T, F>(f: F) -> ArbiterResult<T>
where
    F: FnOnce() -> ArbiterResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ArbiterError::external("blocking_pool", e.to_string()))?
}
