//! Versioned prompt/behavior configurations for one (agent, decision type) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_PERCENT;

string_enum! {
    /// Lifecycle status of a version.
    VersionStatus {
        Testing => "testing",
        Active => "active",
        Archived => "archived",
        Rejected => "rejected",
    }
}

/// The decision-making configuration carried by a version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionConfig {
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default)]
    pub system_instructions: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl VersionConfig {
    /// blake3 hash of the canonical JSON encoding.
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }

    /// All text carried by the configuration, for keyword screening.
    pub fn searchable_text(&self) -> String {
        let mut text = String::new();
        for part in [&self.prompt_template, &self.system_instructions]
            .into_iter()
            .flatten()
        {
            text.push_str(part);
            text.push('\n');
        }
        if !self.parameters.is_null() {
            text.push_str(&self.parameters.to_string());
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub agent_name: String,
    pub decision_type: String,
    pub version_label: String,
    pub variant_label: Option<String>,
    pub config: VersionConfig,
    pub status: VersionStatus,
    /// 0–100. Selection weight among partial rollouts.
    pub rollout_percentage: u8,
    /// Lineage: the version this one was derived from.
    pub parent_version_id: Option<String>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Version {
    pub fn is_full_rollout(&self) -> bool {
        self.status == VersionStatus::Active && self.rollout_percentage >= MAX_PERCENT
    }

    pub fn view(&self) -> ActiveVersionView {
        ActiveVersionView {
            version_id: self.id.clone(),
            version_label: self.version_label.clone(),
            variant_label: self.variant_label.clone(),
            prompt_template: self.config.prompt_template.clone(),
            system_instructions: self.config.system_instructions.clone(),
            parameters: self.config.parameters.clone(),
        }
    }
}

/// Input to `create_version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVersion {
    pub agent_name: String,
    pub decision_type: String,
    pub version_label: String,
    #[serde(default)]
    pub variant_label: Option<String>,
    #[serde(default)]
    pub config: VersionConfig,
    /// Defaults to `testing`.
    #[serde(default)]
    pub status: Option<VersionStatus>,
    /// Defaults to 0.
    #[serde(default)]
    pub rollout_percentage: Option<u8>,
    #[serde(default)]
    pub parent_version_id: Option<String>,
    pub created_by: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewVersion {
    pub fn new(
        agent_name: impl Into<String>,
        decision_type: impl Into<String>,
        version_label: impl Into<String>,
        config: VersionConfig,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            decision_type: decision_type.into(),
            version_label: version_label.into(),
            variant_label: None,
            config,
            status: None,
            rollout_percentage: None,
            parent_version_id: None,
            created_by: created_by.into(),
            notes: None,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant_label = Some(variant.into());
        self
    }

    pub fn with_status(mut self, status: VersionStatus, rollout_percentage: u8) -> Self {
        self.status = Some(status);
        self.rollout_percentage = Some(rollout_percentage);
        self
    }

    pub fn with_parent(mut self, parent_version_id: impl Into<String>) -> Self {
        self.parent_version_id = Some(parent_version_id.into());
        self
    }
}

/// What an agent receives from `get_active_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveVersionView {
    pub version_id: String,
    pub version_label: String,
    pub variant_label: Option<String>,
    pub prompt_template: Option<String>,
    pub system_instructions: Option<String>,
    pub parameters: serde_json::Value,
}
