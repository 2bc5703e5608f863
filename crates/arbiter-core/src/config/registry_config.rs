use serde::{Deserialize, Serialize};

/// How `get_active_version` picks among several `active` versions when no
/// experiment is running for the (agent, decision type) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutSelection {
    /// Highest rollout percentage wins, most recent creation breaks ties.
    #[default]
    Highest,
    /// Weighted random choice, weight = rollout percentage.
    Weighted,
}

/// Version registry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub rollout_selection: RolloutSelection,
}
