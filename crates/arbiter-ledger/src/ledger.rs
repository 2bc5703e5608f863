//! DecisionLedger: decision + outcome writes and range reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use arbiter_core::errors::ArbiterResult;
use arbiter_core::models::{DecisionQuery, DecisionRecord, NewDecision, NewOutcome};
use arbiter_core::traits::IDecisionStorage;
use arbiter_observability::ledger_span;
use arbiter_observability::tracing_setup::events;

/// The decision ledger. Cheap to clone; all state lives in storage.
#[derive(Clone)]
pub struct DecisionLedger {
    storage: Arc<dyn IDecisionStorage>,
}

impl DecisionLedger {
    pub fn new(storage: Arc<dyn IDecisionStorage>) -> Self {
        Self { storage }
    }

    /// Persist a decision and return its id. Fails only when the store does.
    pub fn log_decision(&self, decision: NewDecision) -> ArbiterResult<String> {
        let span = ledger_span!("log_decision", decision.agent_name);
        let _guard = span.enter();

        let id = uuid::Uuid::new_v4().to_string();
        let decision = decision.into_decision(id.clone(), Utc::now());
        self.storage.insert_decision(&decision)?;
        info!(
            decision_id = %id,
            decision_type = %decision.decision_type,
            version_label = decision.version_label.as_deref().unwrap_or("-"),
            "decision logged"
        );
        Ok(id)
    }

    /// Like [`log_decision`](Self::log_decision) but never fails: a storage
    /// error is logged and `None` returned, so the agent's own action
    /// proceeds.
    pub fn log_decision_best_effort(&self, decision: NewDecision) -> Option<String> {
        let agent = decision.agent_name.clone();
        match self.log_decision(decision) {
            Ok(id) => Some(id),
            Err(e) => {
                events::degradation_triggered("ledger", &e.to_string(), "decision dropped");
                tracing::warn!(agent = %agent, error = %e, "failed to log decision");
                None
            }
        }
    }

    /// Attach an outcome to an existing decision. `NotFound` when the
    /// decision does not exist.
    pub fn record_outcome(&self, outcome: NewOutcome) -> ArbiterResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let outcome = outcome.into_outcome(id.clone(), Utc::now());
        self.storage.insert_outcome(&outcome)?;
        info!(
            outcome_id = %id,
            decision_id = %outcome.decision_id,
            value = outcome.value.map(|v| v.value()),
            source = outcome.source.as_str(),
            "outcome recorded"
        );
        Ok(id)
    }

    pub fn record_outcome_best_effort(&self, outcome: NewOutcome) -> Option<String> {
        let decision_id = outcome.decision_id.clone();
        match self.record_outcome(outcome) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(decision_id = %decision_id, error = %e, "failed to record outcome");
                None
            }
        }
    }

    /// A decision with all of its outcomes, oldest first.
    pub fn get_decision(&self, id: &str) -> ArbiterResult<Option<DecisionRecord>> {
        self.storage.get_decision(id)
    }

    /// Decisions in `[from, to)` for an agent, optionally one decision type.
    pub fn decisions_in_range(
        &self,
        agent_name: &str,
        decision_type: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ArbiterResult<Vec<DecisionRecord>> {
        let mut query = DecisionQuery::for_agent(agent_name, from).until(to);
        if let Some(decision_type) = decision_type {
            query = query.decision_type(decision_type);
        }
        let records = self.storage.query_decisions(&query)?;
        debug!(agent = agent_name, count = records.len(), "decision range loaded");
        Ok(records)
    }

    /// Run an arbitrary filter.
    pub fn query(&self, query: &DecisionQuery) -> ArbiterResult<Vec<DecisionRecord>> {
        self.storage.query_decisions(query)
    }
}
