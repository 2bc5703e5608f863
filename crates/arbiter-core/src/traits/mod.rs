//! Seams between the engines and their collaborators.

mod collaborators;
mod random;
mod storage;

pub use collaborators::{IInsightGenerator, IReviewQueue, ITrafficResolver, NoOpInsightGenerator};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use storage::{
    IApprovalStorage, IArbiterStorage, IAuditStorage, IDecisionStorage, IExperimentStorage,
    IInsightStorage, IVersionStorage,
};
