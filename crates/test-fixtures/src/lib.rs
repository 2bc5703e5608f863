//! Shared test support: golden dataset loader, model builders, a scripted
//! insight generator and a failing decision store.

mod builders;
mod generator;
mod unavailable;

pub use builders::{approval_request, decision, new_version, version_config};
pub use generator::ScriptedGenerator;
pub use unavailable::UnavailableStore;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;

/// Root directory of the fixture data shipped with this crate.
fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Load a fixture file as raw text (generator responses are raw text).
pub fn load_fixture_text(relative_path: &str) -> String {
    let path = fixtures_root().join(relative_path);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

/// Check that a fixture file exists.
pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

/// One decision in a golden scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct GoldenDecision {
    pub decision_type: String,
    pub decision_made: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub version_label: Option<String>,
    /// Outcome value to record afterwards, if any.
    #[serde(default)]
    pub outcome: Option<f64>,
}

/// A golden ledger scenario with the metrics it must produce.
#[derive(Debug, Clone, Deserialize)]
pub struct GoldenScenario {
    pub agent_name: String,
    pub decisions: Vec<GoldenDecision>,
    pub expected: GoldenExpectation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoldenExpectation {
    pub total_decisions: u64,
    #[serde(default)]
    pub avg_confidence: Option<f64>,
    pub evaluated_decisions: u64,
    pub successful_decisions: u64,
    pub success_rate: f64,
}

/// Two-arm success counts and the verdict they must produce.
#[derive(Debug, Clone, Deserialize)]
pub struct SignificanceCase {
    pub name: String,
    pub control_evaluated: u64,
    pub control_successes: u64,
    pub test_evaluated: u64,
    pub test_successes: u64,
    pub min_significance: Option<f64>,
    pub max_significance: Option<f64>,
    pub winner: String,
}
