use super::StorageError;

/// Top-level error taxonomy.
///
/// `NotFound`, `InvalidState` and `ValidationFailure` are caller errors and are
/// surfaced synchronously. `ExternalDependencyFailure` is absorbed by the
/// aggregator, which degrades instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid state for {entity} {id}: {reason}")]
    InvalidState {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("external dependency {dependency} failed: {reason}")]
    ExternalDependencyFailure { dependency: String, reason: String },

    #[error("validation failed: {reason}")]
    ValidationFailure { reason: String },

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("config error: {0}")]
    ConfigError(String),
}

impl ArbiterError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationFailure {
            reason: reason.into(),
        }
    }

    pub fn external(dependency: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalDependencyFailure {
            dependency: dependency.into(),
            reason: reason.into(),
        }
    }

    /// True for errors the caller caused and can correct by changing input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::InvalidState { .. } | Self::ValidationFailure { .. }
        )
    }
}
