//! InsightAggregator: analyze a window of the ledger and roll up daily
//! snapshots.
//!
//! Pipeline: load records → local metrics → analysis dependency → strict
//! parse → per-variant version + approval request → persist insight.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};

use arbiter_approval::ApprovalWorkflow;
use arbiter_core::config::InsightConfig;
use arbiter_core::constants::SYSTEM_ACTOR;
use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{
    AnalysisOutput, AnalysisStatus, ApprovalPriority, ApprovalRequestType, DecisionRecord,
    LearningInsight, NewApprovalRequest, NewVersion, PerformanceMetrics, PerformanceSnapshot,
    ProposedVariant, VersionConfig,
};
use arbiter_core::traits::{IExperimentStorage, IInsightGenerator, IInsightStorage};
use arbiter_ledger::DecisionLedger;
use arbiter_observability::insight_span;
use arbiter_observability::tracing_setup::events;
use arbiter_registry::VersionRegistry;

use crate::metrics;
use crate::parse::{self, AnalysisParse};
use crate::request;

/// Versions and requests created from one insight's variants.
#[derive(Debug, Default)]
struct Spawned {
    version_ids: Vec<String>,
    request_ids: Vec<String>,
}

pub struct InsightAggregator {
    ledger: DecisionLedger,
    insights: Arc<dyn IInsightStorage>,
    experiments: Arc<dyn IExperimentStorage>,
    registry: Arc<VersionRegistry>,
    approval: Arc<ApprovalWorkflow>,
    generator: Arc<dyn IInsightGenerator>,
    config: InsightConfig,
    success_threshold: f64,
}

impl InsightAggregator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: DecisionLedger,
        insights: Arc<dyn IInsightStorage>,
        experiments: Arc<dyn IExperimentStorage>,
        registry: Arc<VersionRegistry>,
        approval: Arc<ApprovalWorkflow>,
        generator: Arc<dyn IInsightGenerator>,
        config: InsightConfig,
        success_threshold: f64,
    ) -> Self {
        Self {
            ledger,
            insights,
            experiments,
            registry,
            approval,
            generator,
            config,
            success_threshold,
        }
    }

    /// Summarize `[period_start, period_end)` for an agent, optionally
    /// narrowed to one decision type.
    ///
    /// A failing or unparsable analysis dependency does not fail the call:
    /// the insight is persisted with local metrics only and marked degraded.
    pub fn analyze(
        &self,
        agent_name: &str,
        decision_type: Option<&str>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> ArbiterResult<LearningInsight> {
        let span = insight_span!(agent_name);
        let _guard = span.enter();

        if agent_name.trim().is_empty() {
            return Err(ArbiterError::validation("agent name must not be empty"));
        }
        if period_start > period_end {
            return Err(ArbiterError::validation(format!(
                "period start {period_start} is after period end {period_end}"
            )));
        }

        let records =
            self.ledger
                .decisions_in_range(agent_name, decision_type, period_start, period_end)?;
        let metrics = self.local_metrics(&records);
        let avg_confidence = metrics::avg_confidence(&records);
        let local_summary = metrics::describe(&metrics, avg_confidence);

        let analysis = request::analysis_request(
            agent_name,
            decision_type,
            period_start,
            period_end,
            metrics.clone(),
            local_summary.clone(),
            &records,
            self.config.decision_sample_size,
        );

        let (output, status) = match self.generator.generate(&analysis) {
            Ok(raw) => match parse::parse_analysis(&raw) {
                AnalysisParse::Parsed(output) => (output, AnalysisStatus::Completed),
                AnalysisParse::Unparsable { raw, reason } => {
                    debug!(raw = %raw, "unparsable analysis response");
                    events::degradation_triggered(
                        self.generator.name(),
                        &format!("unparsable response: {reason}"),
                        "local metrics only",
                    );
                    (AnalysisOutput::default(), AnalysisStatus::Degraded)
                }
            },
            Err(e) => {
                events::degradation_triggered(
                    self.generator.name(),
                    &e.to_string(),
                    "local metrics only",
                );
                (AnalysisOutput::default(), AnalysisStatus::Degraded)
            }
        };

        let insight_id = uuid::Uuid::new_v4().to_string();
        let spawned = self.spawn_variants(&insight_id, agent_name, decision_type, &metrics, &output.variants);

        let insight = LearningInsight {
            id: insight_id,
            agent_name: agent_name.to_string(),
            decision_type: decision_type.map(str::to_string),
            period_start,
            period_end,
            total_decisions: metrics.total_decisions,
            avg_confidence,
            metrics,
            patterns: output.patterns,
            suggestions: output.suggestions,
            proposed_variants: output.variants,
            summary: output.summary.unwrap_or(local_summary),
            analysis_status: status,
            spawned_version_ids: spawned.version_ids,
            spawned_request_ids: spawned.request_ids,
            created_at: Utc::now(),
        };
        self.insights.insert_insight(&insight)?;

        info!(
            insight_id = %insight.id,
            decisions = insight.total_decisions,
            status = insight.analysis_status.as_str(),
            versions = insight.spawned_version_ids.len(),
            requests = insight.spawned_request_ids.len(),
            "insight recorded"
        );
        Ok(insight)
    }

    /// Upsert the rollup for one UTC calendar day. `None` when the agent
    /// logged nothing that day; no row is written in that case.
    pub fn snapshot(
        &self,
        agent_name: &str,
        date: NaiveDate,
    ) -> ArbiterResult<Option<PerformanceSnapshot>> {
        let span = insight_span!(agent_name);
        let _guard = span.enter();

        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = date
            .succ_opt()
            .ok_or_else(|| ArbiterError::validation(format!("no day follows {date}")))?
            .and_time(NaiveTime::MIN)
            .and_utc();

        let records = self
            .ledger
            .decisions_in_range(agent_name, None, day_start, day_end)?;
        if records.is_empty() {
            debug!(%date, "no decisions, snapshot skipped");
            return Ok(None);
        }

        let metrics = self.local_metrics(&records);
        let snapshot = PerformanceSnapshot {
            agent_name: agent_name.to_string(),
            snapshot_date: date,
            total_decisions: metrics.total_decisions,
            evaluated_decisions: metrics.evaluated_decisions,
            successful_decisions: metrics.successful_decisions,
            accuracy: metrics.success_rate,
            avg_confidence: metrics::avg_confidence(&records),
            active_versions: self.registry.count_active_versions(agent_name)?,
            running_experiments: self.experiments.count_running_experiments(agent_name)?,
            updated_at: Utc::now(),
        };
        self.insights.upsert_snapshot(&snapshot)?;
        info!(%date, decisions = snapshot.total_decisions, "snapshot upserted");
        Ok(Some(snapshot))
    }

    pub fn get_insight(&self, insight_id: &str) -> ArbiterResult<Option<LearningInsight>> {
        self.insights.get_insight(insight_id)
    }

    pub fn get_snapshot(
        &self,
        agent_name: &str,
        date: NaiveDate,
    ) -> ArbiterResult<Option<PerformanceSnapshot>> {
        self.insights.get_snapshot(agent_name, date)
    }

    fn local_metrics(&self, records: &[DecisionRecord]) -> PerformanceMetrics {
        metrics::performance_metrics(
            records,
            self.success_threshold,
            self.config.high_confidence,
            self.config.medium_confidence,
        )
    }

    /// Turn each proposed variant into a `testing` version and an approval
    /// request. A variant that cannot be materialized is logged and skipped;
    /// a version whose request failed stays listed so it can be resubmitted.
    fn spawn_variants(
        &self,
        insight_id: &str,
        agent_name: &str,
        decision_type: Option<&str>,
        metrics: &PerformanceMetrics,
        variants: &[ProposedVariant],
    ) -> Spawned {
        let mut spawned = Spawned::default();
        for variant in variants {
            if let Err(e) =
                self.spawn_variant(insight_id, agent_name, decision_type, metrics, variant, &mut spawned)
            {
                warn!(variant = %variant.variant_label, error = %e, "variant not materialized");
            }
        }
        spawned
    }

    fn spawn_variant(
        &self,
        insight_id: &str,
        agent_name: &str,
        decision_type: Option<&str>,
        metrics: &PerformanceMetrics,
        variant: &ProposedVariant,
        spawned: &mut Spawned,
    ) -> ArbiterResult<()> {
        let Some(target_type) = variant.decision_type.as_deref().or(decision_type) else {
            return Err(ArbiterError::validation(
                "variant names no decision type and the insight covers all types",
            ));
        };

        let config = VersionConfig {
            prompt_template: variant.prompt_template.clone(),
            system_instructions: variant.system_instructions.clone(),
            parameters: variant.parameters.clone(),
        };
        if let Some(existing) =
            self.registry
                .find_by_content_hash(agent_name, target_type, &config.content_hash())?
        {
            info!(
                variant = %variant.variant_label,
                existing = %existing.version_label,
                "variant matches an existing version, skipped"
            );
            return Ok(());
        }

        let screen = self.approval.screen();
        let searchable = config.searchable_text();
        let sensitive = screen.is_sensitive_type(target_type)
            || screen.mentions_sensitive_topic(&[
                variant.variant_label.as_str(),
                variant.rationale.as_str(),
                searchable.as_str(),
            ]);

        let parent = self.registry.current_baseline(agent_name, target_type)?;
        let mut new = NewVersion::new(
            agent_name,
            target_type,
            format!("{}-{}", variant.variant_label, short_id(insight_id)),
            config,
            SYSTEM_ACTOR,
        )
        .with_variant(variant.variant_label.clone());
        new.notes = (!variant.rationale.is_empty()).then(|| variant.rationale.clone());
        if let Some(parent) = &parent {
            new = new.with_parent(parent.id.clone());
        }
        let version_id = self.registry.create_version(new)?;
        spawned.version_ids.push(version_id.clone());

        let priority = variant.risk.unwrap_or(ApprovalPriority::Medium);
        let request_type = if sensitive {
            ApprovalRequestType::EscalationChange
        } else {
            ApprovalRequestType::NewVersion
        };
        let mut request = NewApprovalRequest::new(
            &version_id,
            request_type,
            priority,
            format!(
                "Variant '{}' for {agent_name}/{target_type}: {}",
                variant.variant_label, variant.rationale
            ),
            format!("{priority} (proposed by analysis)"),
            SYSTEM_ACTOR,
        );
        request.insight_id = Some(insight_id.to_string());
        request.impact_analysis = serde_json::json!({
            "baseline_version": parent.as_ref().map(|p| p.version_label.as_str()),
            "baseline_success_rate": metrics.success_rate,
            "evaluated_decisions": metrics.evaluated_decisions,
        });
        let request_id = self.approval.submit(request)?;
        spawned.request_ids.push(request_id.clone());

        debug!(
            version_id = %version_id,
            request_id = %request_id,
            request_type = request_type.as_str(),
            "variant proposed"
        );
        Ok(())
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
