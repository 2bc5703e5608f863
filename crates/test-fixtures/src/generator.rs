use std::collections::VecDeque;
use std::sync::Mutex;

use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::AnalysisRequest;
use arbiter_core::traits::IInsightGenerator;

/// Replays scripted responses in order. `Err` entries simulate an
/// unreachable dependency. Once the script runs out, every call fails.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    pub fn fail(self, reason: impl Into<String>) -> Self {
        self.push(Err(reason.into()));
        self
    }

    fn push(&self, entry: Result<String, String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl IInsightGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, request: &AnalysisRequest) -> ArbiterResult<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(ArbiterError::external("insight_generator", reason)),
            None => Err(ArbiterError::external("insight_generator", "script exhausted")),
        }
    }
}
