use crate::errors::ArbiterResult;
use crate::models::{AnalysisRequest, ReviewTask, Version};

/// Routes a decision through a running experiment, if any.
///
/// Implemented by the experiment engine's allocator and injected into the
/// registry, so the registry never depends on the experiment crate.
pub trait ITrafficResolver: Send + Sync {
    /// `Ok(None)` when no experiment is running for the pair.
    fn resolve(&self, agent_name: &str, decision_type: &str) -> ArbiterResult<Option<Version>>;
}

/// Human-review surface. Every approval request creates one task.
pub trait IReviewQueue: Send + Sync {
    fn create_task(&self, task: &ReviewTask) -> ArbiterResult<()>;
    fn open_tasks(&self) -> ArbiterResult<Vec<ReviewTask>>;
}

/// External analysis dependency (an LLM behind an HTTP call in production).
///
/// Returns the raw response text. The aggregator validates it; an error or
/// unparsable text degrades the insight instead of failing it.
pub trait IInsightGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &AnalysisRequest) -> ArbiterResult<String>;
}

/// Generator used when no analysis dependency is configured.
pub struct NoOpInsightGenerator;

impl IInsightGenerator for NoOpInsightGenerator {
    fn name(&self) -> &str {
        "noop"
    }

    fn generate(&self, _request: &AnalysisRequest) -> ArbiterResult<String> {
        Ok(r#"{"patterns": [], "suggestions": [], "variants": []}"#.to_string())
    }
}
