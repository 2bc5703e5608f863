//! TrafficAllocator: routes decisions of a pair through its running
//! experiment. Injected into the registry as its traffic resolver.

use std::sync::Arc;

use tracing::debug;

use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{Experiment, Version};
use arbiter_core::traits::{IExperimentStorage, ITrafficResolver, IVersionStorage, RandomSource};

use crate::allocation;

pub struct TrafficAllocator {
    experiments: Arc<dyn IExperimentStorage>,
    versions: Arc<dyn IVersionStorage>,
    random: Arc<dyn RandomSource>,
}

impl TrafficAllocator {
    pub fn new(
        experiments: Arc<dyn IExperimentStorage>,
        versions: Arc<dyn IVersionStorage>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            experiments,
            versions,
            random,
        }
    }

    /// One independent draw for a running experiment.
    pub fn resolve_traffic_version(&self, experiment_id: &str) -> ArbiterResult<Version> {
        let experiment = self
            .experiments
            .get_experiment(experiment_id)?
            .ok_or_else(|| ArbiterError::not_found("experiment", experiment_id))?;
        if experiment.status.is_terminal() {
            return Err(ArbiterError::invalid_state(
                "experiment",
                experiment_id,
                format!("experiment is {}", experiment.status),
            ));
        }
        self.allocate(&experiment)
    }

    fn allocate(&self, experiment: &Experiment) -> ArbiterResult<Version> {
        let arm = allocation::draw(experiment.traffic_split, self.random.next_unit());
        let version_id = experiment.version_for(arm);
        let version = self
            .versions
            .get_version(version_id)?
            .ok_or_else(|| ArbiterError::not_found("version", version_id))?;
        debug!(
            experiment_id = %experiment.id,
            arm = arm.as_str(),
            version_label = %version.version_label,
            "traffic allocated"
        );
        Ok(version)
    }
}

impl ITrafficResolver for TrafficAllocator {
    fn resolve(&self, agent_name: &str, decision_type: &str) -> ArbiterResult<Option<Version>> {
        match self
            .experiments
            .running_experiment_for(agent_name, decision_type)?
        {
            Some(experiment) => self.allocate(&experiment).map(Some),
            None => Ok(None),
        }
    }
}
