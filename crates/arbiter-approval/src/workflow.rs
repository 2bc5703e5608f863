//! ApprovalWorkflow: submit, approve (with promotion), reject.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use arbiter_core::config::ApprovalConfig;
use arbiter_core::constants::{MAX_PERCENT, SYSTEM_ACTOR};
use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{
    ApprovalPriority, ApprovalRequest, ApprovalStatus, AuditOperation, NewApprovalRequest,
    ReviewTask, Version,
};
use arbiter_core::traits::{IApprovalStorage, IReviewQueue};
use arbiter_observability::approval_span;
use arbiter_observability::tracing_setup::events;
use arbiter_registry::VersionRegistry;

use crate::screening::SensitivityScreen;

pub struct ApprovalWorkflow {
    storage: Arc<dyn IApprovalStorage>,
    registry: Arc<VersionRegistry>,
    review_queue: Arc<dyn IReviewQueue>,
    screen: SensitivityScreen,
}

impl ApprovalWorkflow {
    pub fn new(
        storage: Arc<dyn IApprovalStorage>,
        registry: Arc<VersionRegistry>,
        review_queue: Arc<dyn IReviewQueue>,
        config: &ApprovalConfig,
    ) -> ArbiterResult<Self> {
        Ok(Self {
            storage,
            registry,
            review_queue,
            screen: SensitivityScreen::new(config)?,
        })
    }

    pub fn screen(&self) -> &SensitivityScreen {
        &self.screen
    }

    /// Enqueue a request for review and open its review task.
    ///
    /// A sensitive decision type or sensitive content anywhere in the
    /// request or the target version's configuration forces `high` priority
    /// and human review, whatever the caller asked for.
    pub fn submit(&self, new: NewApprovalRequest) -> ArbiterResult<String> {
        let version = self.registry.require_version(&new.version_id)?;

        let impact = new.impact_analysis.to_string();
        let config_text = version.config.searchable_text();
        let keyword = self
            .screen
            .find_keyword(&[
                new.change_summary.as_str(),
                new.risk_assessment.as_str(),
                impact.as_str(),
                config_text.as_str(),
            ])
            .map(str::to_string);
        let sensitive_type = self.screen.is_sensitive_type(&version.decision_type);
        let requires_human_review = sensitive_type || keyword.is_some();
        let priority = if requires_human_review {
            ApprovalPriority::High
        } else {
            new.priority
        };

        let id = uuid::Uuid::new_v4().to_string();
        let request = ApprovalRequest {
            id: id.clone(),
            version_id: version.id.clone(),
            decision_type: version.decision_type.clone(),
            insight_id: new.insight_id,
            experiment_id: new.experiment_id,
            request_type: new.request_type,
            priority,
            change_summary: new.change_summary,
            impact_analysis: new.impact_analysis,
            risk_assessment: new.risk_assessment,
            requested_by: new.requested_by,
            status: ApprovalStatus::Pending,
            requires_human_review,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            approved_rollout: None,
            created_at: Utc::now(),
        };

        let span = approval_span!("submit", id);
        let _guard = span.enter();

        self.storage.insert_request(&request)?;
        info!(
            version_id = %request.version_id,
            request_type = request.request_type.as_str(),
            priority = request.priority.as_str(),
            requires_human_review,
            sensitive_type,
            keyword = keyword.as_deref().unwrap_or(""),
            "approval request submitted"
        );

        let task = review_task(&request, &version);
        if let Err(e) = self.review_queue.create_task(&task) {
            events::degradation_triggered(
                "review_queue",
                &e.to_string(),
                "request stays pending without a task",
            );
        }
        Ok(id)
    }

    /// Approve a request and promote its version to `rollout` (default 100).
    ///
    /// A pending request moves to `approved`. An approved request can be
    /// approved again only with a strictly higher rollout (graduated
    /// rollout). If promotion fails the request is restored and the error
    /// returned.
    pub fn approve(
        &self,
        request_id: &str,
        reviewer: &str,
        notes: Option<String>,
        rollout: Option<u8>,
    ) -> ArbiterResult<ApprovalRequest> {
        let span = approval_span!("approve", request_id);
        let _guard = span.enter();

        let rollout = rollout.unwrap_or(MAX_PERCENT);
        if rollout > MAX_PERCENT {
            return Err(ArbiterError::validation(format!(
                "rollout percentage must be within 0..=100, got {rollout}"
            )));
        }

        let previous = self.require(request_id)?;
        match previous.status {
            ApprovalStatus::Pending => {}
            ApprovalStatus::Approved => {
                let applied = previous.approved_rollout.unwrap_or(0);
                if rollout <= applied {
                    return Err(ArbiterError::invalid_state(
                        "approval_request",
                        request_id,
                        format!("already approved at {applied}% rollout"),
                    ));
                }
            }
            ApprovalStatus::Rejected => {
                return Err(ArbiterError::invalid_state(
                    "approval_request",
                    request_id,
                    "request was rejected",
                ));
            }
        }

        let mut approved = previous.clone();
        approved.status = ApprovalStatus::Approved;
        approved.reviewed_by = Some(reviewer.to_string());
        approved.reviewed_at = Some(Utc::now());
        approved.review_notes = notes.or(previous.review_notes.clone());
        approved.approved_rollout = Some(rollout);

        if !self.storage.update_request_if(
            &approved,
            &previous,
            AuditOperation::Approve,
            reviewer,
        )? {
            return Err(ArbiterError::invalid_state(
                "approval_request",
                request_id,
                "request changed during review",
            ));
        }

        if let Err(e) = self.registry.promote(&approved.version_id, reviewer, rollout) {
            self.compensate(&previous, &approved, &e);
            return Err(e);
        }

        events::status_transition(
            "approval_request",
            request_id,
            previous.status.as_str(),
            approved.status.as_str(),
        );
        info!(version_id = %approved.version_id, rollout, reviewer, "request approved");
        Ok(approved)
    }

    /// Restore the request to its state before a failed approval.
    fn compensate(
        &self,
        previous: &ApprovalRequest,
        applied: &ApprovalRequest,
        cause: &ArbiterError,
    ) {
        match self.storage.update_request_if(
            previous,
            applied,
            AuditOperation::Rollback,
            SYSTEM_ACTOR,
        ) {
            Ok(true) => {
                warn!(request_id = %previous.id, error = %cause, "promotion failed, approval rolled back");
            }
            Ok(false) => {
                warn!(request_id = %previous.id, error = %cause, "promotion failed, request changed before rollback");
            }
            Err(e) => {
                warn!(request_id = %previous.id, error = %cause, rollback_error = %e, "promotion failed and rollback failed");
            }
        }
    }

    /// Reject a pending request. The version is left untouched.
    pub fn reject(
        &self,
        request_id: &str,
        reviewer: &str,
        notes: Option<String>,
    ) -> ArbiterResult<ApprovalRequest> {
        let span = approval_span!("reject", request_id);
        let _guard = span.enter();

        let previous = self.require(request_id)?;
        if previous.status != ApprovalStatus::Pending {
            return Err(ArbiterError::invalid_state(
                "approval_request",
                request_id,
                format!("cannot reject a {} request", previous.status),
            ));
        }

        let mut rejected = previous.clone();
        rejected.status = ApprovalStatus::Rejected;
        rejected.reviewed_by = Some(reviewer.to_string());
        rejected.reviewed_at = Some(Utc::now());
        rejected.review_notes = notes;

        if !self.storage.update_request_if(
            &rejected,
            &previous,
            AuditOperation::Reject,
            reviewer,
        )? {
            return Err(ArbiterError::invalid_state(
                "approval_request",
                request_id,
                "request changed during review",
            ));
        }
        info!(version_id = %rejected.version_id, reviewer, "request rejected");
        Ok(rejected)
    }

    /// Pending requests, highest priority first, oldest first within a
    /// priority.
    pub fn pending_queue(&self) -> ArbiterResult<Vec<ApprovalRequest>> {
        self.storage.pending_requests()
    }

    pub fn get(&self, request_id: &str) -> ArbiterResult<Option<ApprovalRequest>> {
        self.storage.get_request(request_id)
    }

    fn require(&self, request_id: &str) -> ArbiterResult<ApprovalRequest> {
        self.storage
            .get_request(request_id)?
            .ok_or_else(|| ArbiterError::not_found("approval_request", request_id))
    }
}

fn review_task(request: &ApprovalRequest, version: &Version) -> ReviewTask {
    ReviewTask {
        id: uuid::Uuid::new_v4().to_string(),
        approval_request_id: request.id.clone(),
        title: format!(
            "Review {} for {}/{} ({})",
            request.request_type, version.agent_name, version.decision_type, version.version_label
        ),
        description: format!(
            "{}\n\nRisk: {}",
            request.change_summary, request.risk_assessment
        ),
        priority: request.priority,
        escalated: request.requires_human_review,
        created_at: request.created_at,
    }
}
