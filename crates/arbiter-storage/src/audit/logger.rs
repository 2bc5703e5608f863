//! Log every status transition: version create/promote/archive, request
//! submit/approve/reject/rollback, experiment create/complete/abort,
//! insight create.

use rusqlite::Connection;

use arbiter_core::errors::ArbiterResult;
use arbiter_core::models::{AuditEntity, AuditEntry, AuditOperation};

use crate::queries::audit_ops;

/// Append-only audit logger. Always called with the connection (or
/// transaction) that performs the transition it describes.
pub struct AuditLogger;

impl AuditLogger {
    pub fn log(
        conn: &Connection,
        entity: AuditEntity,
        entity_id: &str,
        operation: AuditOperation,
        actor: &str,
        details: serde_json::Value,
    ) -> ArbiterResult<()> {
        let entry = AuditEntry {
            entity,
            entity_id: entity_id.to_string(),
            operation,
            actor: actor.to_string(),
            details,
            timestamp: chrono::Utc::now(),
        };
        audit_ops::insert_audit_entry(conn, &entry)
    }

    /// Log a create operation.
    pub fn log_create(
        conn: &Connection,
        entity: AuditEntity,
        entity_id: &str,
        actor: &str,
    ) -> ArbiterResult<()> {
        Self::log(
            conn,
            entity,
            entity_id,
            AuditOperation::Create,
            actor,
            serde_json::json!({}),
        )
    }
}
