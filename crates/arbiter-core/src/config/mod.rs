//! Layered configuration loaded from TOML. Every section falls back to its
//! defaults, so an empty document is a valid configuration.

mod approval_config;
pub mod defaults;
mod experiment_config;
mod insight_config;
mod observability_config;
mod registry_config;
mod storage_config;

use serde::{Deserialize, Serialize};

pub use approval_config::ApprovalConfig;
pub use experiment_config::ExperimentConfig;
pub use insight_config::InsightConfig;
pub use observability_config::ObservabilityConfig;
pub use registry_config::{RegistryConfig, RolloutSelection};
pub use storage_config::StorageConfig;

use crate::errors::{ArbiterError, ArbiterResult};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub storage: StorageConfig,
    pub registry: RegistryConfig,
    pub experiments: ExperimentConfig,
    pub approval: ApprovalConfig,
    pub insights: InsightConfig,
    pub observability: ObservabilityConfig,
}

impl ArbiterConfig {
    /// Parse a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Parse and validate in one step.
    pub fn load(toml_str: &str) -> ArbiterResult<Self> {
        let config =
            Self::from_toml(toml_str).map_err(|e| ArbiterError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values outside their meaningful range.
    pub fn validate(&self) -> ArbiterResult<()> {
        let e = &self.experiments;
        if !(0.0..=crate::constants::MAX_OUTCOME_SCORE).contains(&e.success_threshold) {
            return Err(ArbiterError::ConfigError(format!(
                "experiments.success_threshold must be within 0..=100, got {}",
                e.success_threshold
            )));
        }
        if !(0.0..=1.0).contains(&e.significance_threshold) {
            return Err(ArbiterError::ConfigError(format!(
                "experiments.significance_threshold must be within 0..=1, got {}",
                e.significance_threshold
            )));
        }
        if e.max_duration_days > defaults::MAX_EXPERIMENT_DURATION_DAYS {
            return Err(ArbiterError::ConfigError(format!(
                "experiments.max_duration_days must be within 0..={}, got {}",
                defaults::MAX_EXPERIMENT_DURATION_DAYS,
                e.max_duration_days
            )));
        }
        let i = &self.insights;
        if !(0.0..=1.0).contains(&i.medium_confidence)
            || !(0.0..=1.0).contains(&i.high_confidence)
            || i.medium_confidence > i.high_confidence
        {
            return Err(ArbiterError::ConfigError(format!(
                "insights confidence bounds must satisfy 0 <= medium ({}) <= high ({}) <= 1",
                i.medium_confidence, i.high_confidence
            )));
        }
        Ok(())
    }
}
