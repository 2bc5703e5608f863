//! Append-only audit rows.

use rusqlite::{params, Connection, Row};

use arbiter_core::errors::ArbiterResult;
use arbiter_core::models::AuditEntry;

use super::codec::{enum_col, fmt_ts, json_col, ts_col};
use crate::to_storage_err;

pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> ArbiterResult<()> {
    conn.execute(
        "INSERT INTO audit_log (entity, entity_id, operation, actor, details, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.entity.as_str(),
            entry.entity_id,
            entry.operation.as_str(),
            entry.actor,
            entry.details.to_string(),
            fmt_ts(&entry.timestamp),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        entity: enum_col(row, 0)?,
        entity_id: row.get(1)?,
        operation: enum_col(row, 2)?,
        actor: row.get(3)?,
        details: json_col(row, 4)?,
        timestamp: ts_col(row, 5)?,
    })
}

/// Every audit row for one entity, oldest first.
pub fn entries_for(conn: &Connection, entity_id: &str) -> ArbiterResult<Vec<AuditEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT entity, entity_id, operation, actor, details, timestamp
             FROM audit_log WHERE entity_id = ?1 ORDER BY id ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![entity_id], row_to_entry)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
