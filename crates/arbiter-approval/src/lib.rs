//! # arbiter-approval
//!
//! Gated queue through which new and winning versions pass before they are
//! promoted. Sensitive decision types and sensitive content are always
//! escalated to human review.

pub mod screening;
mod workflow;

pub use screening::SensitivityScreen;
pub use workflow::ApprovalWorkflow;
