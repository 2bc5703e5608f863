//! # arbiter-registry
//!
//! Versioned decision configurations per (agent, decision type), their
//! lifecycle, and resolution of the version an agent should use right now.

mod registry;
pub mod selection;

pub use registry::VersionRegistry;
