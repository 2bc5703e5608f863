mod arbiter_error;
mod storage_error;

pub use arbiter_error::ArbiterError;
pub use storage_error::StorageError;

/// Result alias used across the workspace.
pub type ArbiterResult<T> = Result<T, ArbiterError>;
