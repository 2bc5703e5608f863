//! VersionRegistry: create, promote, and resolve versions.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use arbiter_core::config::{RegistryConfig, RolloutSelection};
use arbiter_core::constants::MAX_PERCENT;
use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{ActiveVersionView, NewVersion, Version, VersionStatus};
use arbiter_core::traits::{ITrafficResolver, IVersionStorage, RandomSource, ThreadRandom};
use arbiter_observability::registry_span;

use crate::selection;

pub struct VersionRegistry {
    storage: Arc<dyn IVersionStorage>,
    /// Routes through a running experiment when one exists for the pair.
    traffic: Option<Arc<dyn ITrafficResolver>>,
    random: Arc<dyn RandomSource>,
    selection: RolloutSelection,
}

impl VersionRegistry {
    pub fn new(storage: Arc<dyn IVersionStorage>, config: &RegistryConfig) -> Self {
        Self {
            storage,
            traffic: None,
            random: Arc::new(ThreadRandom),
            selection: config.rollout_selection,
        }
    }

    pub fn with_traffic_resolver(mut self, traffic: Arc<dyn ITrafficResolver>) -> Self {
        self.traffic = Some(traffic);
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Register a new version. Defaults to `testing` at 0% rollout. An
    /// explicit `active` status is applied through [`promote`](Self::promote)
    /// so a full rollout archives the previous one.
    pub fn create_version(&self, new: NewVersion) -> ArbiterResult<String> {
        validate_new(&new)?;

        let requested_status = new.status.unwrap_or(VersionStatus::Testing);
        let requested_rollout = new.rollout_percentage.unwrap_or(0);
        let (status, rollout) = match requested_status {
            VersionStatus::Active => (VersionStatus::Testing, 0),
            other => (other, requested_rollout),
        };

        let id = uuid::Uuid::new_v4().to_string();
        let version = Version {
            id: id.clone(),
            agent_name: new.agent_name,
            decision_type: new.decision_type,
            version_label: new.version_label,
            variant_label: new.variant_label,
            content_hash: new.config.content_hash(),
            config: new.config,
            status,
            rollout_percentage: rollout,
            parent_version_id: new.parent_version_id,
            created_by: new.created_by,
            approved_by: None,
            approved_at: None,
            notes: new.notes,
            created_at: Utc::now(),
        };
        self.storage.insert_version(&version, &version.created_by)?;
        info!(
            version_id = %id,
            agent = %version.agent_name,
            decision_type = %version.decision_type,
            label = %version.version_label,
            "version created"
        );

        if requested_status == VersionStatus::Active {
            self.promote(&id, &version.created_by, requested_rollout)?;
        }
        Ok(id)
    }

    /// The version an agent should use for its next decision, if any.
    ///
    /// A running experiment for the pair wins; otherwise the configured
    /// selection runs over the `active` versions.
    pub fn get_active_version(
        &self,
        agent_name: &str,
        decision_type: &str,
    ) -> ArbiterResult<Option<Version>> {
        let span = registry_span!(agent_name, decision_type);
        let _guard = span.enter();

        if let Some(traffic) = &self.traffic {
            match traffic.resolve(agent_name, decision_type) {
                Ok(Some(version)) => {
                    debug!(version_id = %version.id, "resolved through experiment");
                    return Ok(Some(version));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "experiment resolution failed, using rollout selection");
                }
            }
        }

        let active = self.storage.active_versions(agent_name, decision_type)?;
        let u = match self.selection {
            RolloutSelection::Highest => 0.0,
            RolloutSelection::Weighted => self.random.next_unit(),
        };
        Ok(selection::select(&active, self.selection, u).cloned())
    }

    /// [`get_active_version`](Self::get_active_version) projected to what an
    /// agent consumes.
    pub fn active_view(
        &self,
        agent_name: &str,
        decision_type: &str,
    ) -> ArbiterResult<Option<ActiveVersionView>> {
        Ok(self
            .get_active_version(agent_name, decision_type)?
            .map(|v| v.view()))
    }

    /// Make a version `active` at `rollout_percentage`. A full rollout
    /// archives every other active version of the pair atomically.
    pub fn promote(
        &self,
        version_id: &str,
        reviewer: &str,
        rollout_percentage: u8,
    ) -> ArbiterResult<Version> {
        if rollout_percentage > MAX_PERCENT {
            return Err(ArbiterError::validation(format!(
                "rollout percentage must be within 0..=100, got {rollout_percentage}"
            )));
        }
        let version =
            self.storage
                .promote_version(version_id, reviewer, rollout_percentage, Utc::now())?;
        info!(
            version_id = %version.id,
            reviewer = reviewer,
            rollout = rollout_percentage,
            "version promoted"
        );
        Ok(version)
    }

    pub fn get_version(&self, version_id: &str) -> ArbiterResult<Option<Version>> {
        self.storage.get_version(version_id)
    }

    /// Like [`get_version`](Self::get_version) but `NotFound` when absent.
    pub fn require_version(&self, version_id: &str) -> ArbiterResult<Version> {
        self.storage
            .get_version(version_id)?
            .ok_or_else(|| ArbiterError::not_found("version", version_id))
    }

    /// Every version of the pair, newest first.
    pub fn list_versions(&self, agent_name: &str, decision_type: &str) -> ArbiterResult<Vec<Version>> {
        self.storage.list_versions(agent_name, decision_type)
    }

    pub fn find_by_content_hash(
        &self,
        agent_name: &str,
        decision_type: &str,
        content_hash: &str,
    ) -> ArbiterResult<Option<Version>> {
        self.storage
            .find_by_content_hash(agent_name, decision_type, content_hash)
    }

    /// The version currently serving full (or highest) rollout, ignoring
    /// experiments. Used as the parent of proposed variants.
    pub fn current_baseline(
        &self,
        agent_name: &str,
        decision_type: &str,
    ) -> ArbiterResult<Option<Version>> {
        Ok(self
            .storage
            .active_versions(agent_name, decision_type)?
            .into_iter()
            .next())
    }

    pub fn count_active_versions(&self, agent_name: &str) -> ArbiterResult<u64> {
        self.storage.count_active_versions(agent_name)
    }
}

fn validate_new(new: &NewVersion) -> ArbiterResult<()> {
    for (field, value) in [
        ("agent_name", &new.agent_name),
        ("decision_type", &new.decision_type),
        ("version_label", &new.version_label),
    ] {
        if value.trim().is_empty() {
            return Err(ArbiterError::validation(format!("{field} must not be empty")));
        }
    }
    if let Some(rollout) = new.rollout_percentage {
        if rollout > MAX_PERCENT {
            return Err(ArbiterError::validation(format!(
                "rollout percentage must be within 0..=100, got {rollout}"
            )));
        }
    }
    Ok(())
}
