//! Audit trail for status transitions.

pub mod logger;

pub use logger::AuditLogger;
