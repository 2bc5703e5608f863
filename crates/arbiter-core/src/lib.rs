//! # arbiter-core
//!
//! Foundation crate for the Arbiter decision-intelligence engine.
//! Defines all models, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::ArbiterConfig;
pub use errors::{ArbiterError, ArbiterResult};
pub use models::{Confidence, OutcomeScore};
