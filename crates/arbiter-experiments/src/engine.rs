//! ExperimentEngine: experiment lifecycle and the significance gate.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use arbiter_approval::ApprovalWorkflow;
use arbiter_core::config::ExperimentConfig;
use arbiter_core::constants::{MAX_PERCENT, SYSTEM_ACTOR};
use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{
    ApprovalPriority, ApprovalRequestType, DecisionQuery, DecisionRecord, Experiment, ExperimentMetrics,
    ExperimentStatus, ExperimentWinner, NewApprovalRequest, NewExperiment, Version, VersionStatus,
};
use arbiter_core::traits::{IDecisionStorage, IExperimentStorage};
use arbiter_observability::experiment_span;
use arbiter_observability::tracing_setup::events;
use arbiter_registry::VersionRegistry;

use crate::allocator::TrafficAllocator;
use crate::{metrics, significance};

/// Risk text attached to approval requests for a validated winner.
const WINNER_RISK: &str = "low (statistically validated)";

pub struct ExperimentEngine {
    experiments: Arc<dyn IExperimentStorage>,
    decisions: Arc<dyn IDecisionStorage>,
    registry: Arc<VersionRegistry>,
    allocator: Arc<TrafficAllocator>,
    approval: Arc<ApprovalWorkflow>,
    config: ExperimentConfig,
}

impl ExperimentEngine {
    pub fn new(
        experiments: Arc<dyn IExperimentStorage>,
        decisions: Arc<dyn IDecisionStorage>,
        registry: Arc<VersionRegistry>,
        allocator: Arc<TrafficAllocator>,
        approval: Arc<ApprovalWorkflow>,
        config: ExperimentConfig,
    ) -> Self {
        Self {
            experiments,
            decisions,
            registry,
            allocator,
            approval,
            config,
        }
    }

    /// Start an experiment between two versions of the same pair.
    pub fn create_experiment(&self, new: NewExperiment) -> ArbiterResult<String> {
        if new.name.trim().is_empty() {
            return Err(ArbiterError::validation("experiment name must not be empty"));
        }
        if new.traffic_split > MAX_PERCENT {
            return Err(ArbiterError::validation(format!(
                "traffic split must be within 0..=100, got {}",
                new.traffic_split
            )));
        }
        if new.target_sample_size == 0 {
            return Err(ArbiterError::validation("target sample size must be at least 1"));
        }
        if new.control_version_id == new.test_version_id {
            return Err(ArbiterError::validation(
                "control and test must be different versions",
            ));
        }

        let control = self.registry.require_version(&new.control_version_id)?;
        let test = self.registry.require_version(&new.test_version_id)?;
        if control.agent_name != test.agent_name || control.decision_type != test.decision_type {
            return Err(ArbiterError::validation(format!(
                "arms belong to different pairs: {}/{} vs {}/{}",
                control.agent_name, control.decision_type, test.agent_name, test.decision_type
            )));
        }
        for arm in [&control, &test] {
            ensure_servable(arm)?;
        }

        if let Some(running) = self
            .experiments
            .running_experiment_for(&control.agent_name, &control.decision_type)?
        {
            return Err(ArbiterError::invalid_state(
                "experiment",
                running.id,
                format!(
                    "an experiment is already running for {}/{}",
                    control.agent_name, control.decision_type
                ),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();

        let started_at = Utc::now();
        let expires_at = match self.config.max_duration() {
            Some(lifetime) => Some(started_at.checked_add_signed(lifetime).ok_or_else(|| {
                ArbiterError::ConfigError(format!(
                    "experiments.max_duration_days = {} overflows the experiment deadline",
                    self.config.max_duration_days
                ))
            })?),
            None => None,
        };
        let experiment = Experiment {
            id: id.clone(),
            name: new.name,
            description: new.description,
            agent_name: control.agent_name.clone(),
            decision_type: control.decision_type.clone(),
            control_version_id: control.id.clone(),
            test_version_id: test.id.clone(),
            traffic_split: new.traffic_split,
            target_sample_size: new.target_sample_size,
            current_sample_size: 0,
            metrics: ExperimentMetrics::default(),
            significance: None,
            status: ExperimentStatus::Running,
            winner: None,
            started_at,
            ended_at: None,
            expires_at,
        };
        self.experiments.insert_experiment(&experiment, SYSTEM_ACTOR)?;
        info!(
            experiment_id = %id,
            agent = %experiment.agent_name,
            decision_type = %experiment.decision_type,
            control = %control.version_label,
            test = %test.version_label,
            split = experiment.traffic_split,
            target = experiment.target_sample_size,
            "experiment started"
        );
        Ok(id)
    }

    /// One independent arm draw for a running experiment.
    pub fn resolve_traffic_version(&self, experiment_id: &str) -> ArbiterResult<Version> {
        self.allocator.resolve_traffic_version(experiment_id)
    }

    /// Recount both arms from the ledger. Once the combined sample reaches
    /// the target (or the experiment expires) the significance gate runs
    /// and the experiment completes. A validated test winner is sent for
    /// approval.
    pub fn refresh_metrics(&self, experiment_id: &str) -> ArbiterResult<Experiment> {
        let span = experiment_span!("refresh_metrics", experiment_id);
        let _guard = span.enter();

        let mut experiment = self.require_running(experiment_id)?;
        let control = self.registry.require_version(&experiment.control_version_id)?;
        let test = self.registry.require_version(&experiment.test_version_id)?;

        let threshold = self.config.success_threshold;
        let control_records = self.arm_records(&experiment, &control)?;
        let test_records = self.arm_records(&experiment, &test)?;
        experiment.metrics = ExperimentMetrics {
            control: metrics::arm_metrics(&control_records, threshold),
            test: metrics::arm_metrics(&test_records, threshold),
        };
        experiment.current_sample_size =
            experiment.metrics.control.decisions + experiment.metrics.test.decisions;

        let now = Utc::now();
        let sample_reached = experiment.current_sample_size >= experiment.target_sample_size;
        let expired = experiment.is_expired(now);
        if sample_reached || expired {
            let verdict = significance::evaluate(
                &experiment.metrics.control,
                &experiment.metrics.test,
                self.config.significance_threshold,
            );
            experiment.significance = Some(verdict.significance);
            experiment.winner = Some(verdict.winner);
            experiment.status = ExperimentStatus::Completed;
            experiment.ended_at = Some(now);
            if expired && !sample_reached {
                warn!(
                    sample = experiment.current_sample_size,
                    target = experiment.target_sample_size,
                    "experiment expired before reaching its sample target"
                );
            }
        }

        if !self.experiments.update_experiment(&experiment, SYSTEM_ACTOR)? {
            return Err(ArbiterError::invalid_state(
                "experiment",
                experiment_id,
                "experiment concluded concurrently",
            ));
        }

        if experiment.status == ExperimentStatus::Completed {
            events::status_transition("experiment", experiment_id, "running", "completed");
            info!(
                winner = experiment.winner.map(|w| w.as_str()).unwrap_or("-"),
                significance = experiment.significance,
                control_rate = experiment.metrics.control.success_rate,
                test_rate = experiment.metrics.test.success_rate,
                "experiment completed"
            );
            self.request_winner_promotion(&experiment, &control, &test);
        }
        Ok(experiment)
    }

    /// Refresh every running experiment. Failures are logged per
    /// experiment; the returned list holds the ones that refreshed.
    pub fn refresh_all_running(&self) -> ArbiterResult<Vec<Experiment>> {
        let running = self.experiments.running_experiments()?;
        let mut refreshed = Vec::with_capacity(running.len());
        for experiment in running {
            match self.refresh_metrics(&experiment.id) {
                Ok(updated) => refreshed.push(updated),
                Err(e) => {
                    warn!(experiment_id = %experiment.id, error = %e, "experiment refresh failed");
                }
            }
        }
        Ok(refreshed)
    }

    /// Stop a running experiment without a winner.
    pub fn abort(&self, experiment_id: &str, reason: &str) -> ArbiterResult<Experiment> {
        let span = experiment_span!("abort", experiment_id);
        let _guard = span.enter();

        let mut experiment = self.require_running(experiment_id)?;
        experiment.status = ExperimentStatus::Aborted;
        experiment.ended_at = Some(Utc::now());
        if !self.experiments.update_experiment(&experiment, SYSTEM_ACTOR)? {
            return Err(ArbiterError::invalid_state(
                "experiment",
                experiment_id,
                "experiment concluded concurrently",
            ));
        }
        events::status_transition("experiment", experiment_id, "running", "aborted");
        info!(reason, "experiment aborted");
        Ok(experiment)
    }

    pub fn get_experiment(&self, experiment_id: &str) -> ArbiterResult<Option<Experiment>> {
        self.experiments.get_experiment(experiment_id)
    }

    fn require_running(&self, experiment_id: &str) -> ArbiterResult<Experiment> {
        let experiment = self
            .experiments
            .get_experiment(experiment_id)?
            .ok_or_else(|| ArbiterError::not_found("experiment", experiment_id))?;
        if experiment.status.is_terminal() {
            return Err(ArbiterError::invalid_state(
                "experiment",
                experiment_id,
                format!("experiment is already {}", experiment.status),
            ));
        }
        Ok(experiment)
    }

    /// Decisions of the pair tagged with the arm's version label since start.
    fn arm_records(
        &self,
        experiment: &Experiment,
        version: &Version,
    ) -> ArbiterResult<Vec<DecisionRecord>> {
        let query = DecisionQuery::for_agent(&experiment.agent_name, experiment.started_at)
            .decision_type(&experiment.decision_type)
            .version_label(&version.version_label);
        self.decisions.query_decisions(&query)
    }

    /// Submit an `experiment_winner` request when the test arm won above the
    /// significance threshold. The experiment is already completed, so a
    /// failure here is logged rather than returned.
    fn request_winner_promotion(&self, experiment: &Experiment, control: &Version, test: &Version) {
        let significance = experiment.significance.unwrap_or(0.0);
        if experiment.winner != Some(ExperimentWinner::Test)
            || significance < self.config.significance_threshold
        {
            return;
        }

        let mut request = NewApprovalRequest::new(
            &test.id,
            ApprovalRequestType::ExperimentWinner,
            ApprovalPriority::High,
            format!(
                "Experiment '{}': {} beat {} ({:.1}% vs {:.1}% success)",
                experiment.name,
                test.version_label,
                control.version_label,
                experiment.metrics.test.success_rate * 100.0,
                experiment.metrics.control.success_rate * 100.0,
            ),
            WINNER_RISK,
            SYSTEM_ACTOR,
        );
        request.experiment_id = Some(experiment.id.clone());
        request.impact_analysis = serde_json::json!({
            "significance": significance,
            "sample_size": experiment.current_sample_size,
            "control": experiment.metrics.control,
            "test": experiment.metrics.test,
        });

        match self.approval.submit(request) {
            Ok(request_id) => {
                info!(request_id = %request_id, version_id = %test.id, "winner submitted for approval");
            }
            Err(e) => events::degradation_triggered(
                "experiments",
                &e.to_string(),
                "winner not submitted for approval",
            ),
        }
    }
}

/// Archived and rejected versions cannot take traffic.
fn ensure_servable(version: &Version) -> ArbiterResult<()> {
    match version.status {
        VersionStatus::Testing | VersionStatus::Active => Ok(()),
        other => Err(ArbiterError::invalid_state(
            "version",
            version.id.clone(),
            format!("a {other} version cannot join an experiment"),
        )),
    }
}
