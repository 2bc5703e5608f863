use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{Decision, DecisionQuery, DecisionRecord, Outcome};
use arbiter_core::traits::IDecisionStorage;

/// A decision store whose writes always fail, as if the disk were gone.
pub struct UnavailableStore;

impl IDecisionStorage for UnavailableStore {
    fn insert_decision(&self, _: &Decision) -> ArbiterResult<()> {
        Err(ArbiterError::external("sqlite", "disk I/O error"))
    }
    fn insert_outcome(&self, _: &Outcome) -> ArbiterResult<()> {
        Err(ArbiterError::external("sqlite", "disk I/O error"))
    }
    fn get_decision(&self, _: &str) -> ArbiterResult<Option<DecisionRecord>> {
        Ok(None)
    }
    fn query_decisions(&self, _: &DecisionQuery) -> ArbiterResult<Vec<DecisionRecord>> {
        Ok(Vec::new())
    }
}
