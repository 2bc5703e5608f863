//! Version rows and the atomic promote/archive transition.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

use arbiter_core::constants::MAX_PERCENT;
use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{AuditEntity, AuditOperation, Version, VersionStatus};

use super::codec::{enum_col, fmt_opt_ts, fmt_ts, is_unique_violation, json_col, opt_ts_col, ts_col};
use crate::audit::AuditLogger;
use crate::to_storage_err;

const VERSION_COLUMNS: &str = "id, agent_name, decision_type, version_label, variant_label, config,
     status, rollout_percentage, parent_version_id, created_by, approved_by, approved_at,
     notes, content_hash, created_at";

pub fn insert_version(conn: &Connection, version: &Version) -> ArbiterResult<()> {
    let config = serde_json::to_string(&version.config)?;
    conn.execute(
        &format!(
            "INSERT INTO versions ({VERSION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            version.id,
            version.agent_name,
            version.decision_type,
            version.version_label,
            version.variant_label,
            config,
            version.status.as_str(),
            version.rollout_percentage,
            version.parent_version_id,
            version.created_by,
            version.approved_by,
            fmt_opt_ts(&version.approved_at),
            version.notes,
            version.content_hash,
            fmt_ts(&version.created_at),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            ArbiterError::validation(format!(
                "version label {} already exists for {}/{}",
                version.version_label, version.agent_name, version.decision_type
            ))
        } else {
            to_storage_err(e.to_string())
        }
    })?;
    Ok(())
}

fn row_to_version(row: &Row<'_>) -> rusqlite::Result<Version> {
    Ok(Version {
        id: row.get(0)?,
        agent_name: row.get(1)?,
        decision_type: row.get(2)?,
        version_label: row.get(3)?,
        variant_label: row.get(4)?,
        config: json_col(row, 5)?,
        status: enum_col(row, 6)?,
        rollout_percentage: row.get(7)?,
        parent_version_id: row.get(8)?,
        created_by: row.get(9)?,
        approved_by: row.get(10)?,
        approved_at: opt_ts_col(row, 11)?,
        notes: row.get(12)?,
        content_hash: row.get(13)?,
        created_at: ts_col(row, 14)?,
    })
}

fn query_versions(
    conn: &Connection,
    sql_tail: &str,
    values: &[&dyn rusqlite::ToSql],
) -> ArbiterResult<Vec<Version>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {VERSION_COLUMNS} FROM versions {sql_tail}"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(values, row_to_version)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn get_version(conn: &Connection, id: &str) -> ArbiterResult<Option<Version>> {
    Ok(query_versions(conn, "WHERE id = ?1", &[&id])?.into_iter().next())
}

pub fn list_versions(
    conn: &Connection,
    agent_name: &str,
    decision_type: &str,
) -> ArbiterResult<Vec<Version>> {
    query_versions(
        conn,
        "WHERE agent_name = ?1 AND decision_type = ?2
         ORDER BY created_at DESC, rowid DESC",
        &[&agent_name, &decision_type],
    )
}

pub fn active_versions(
    conn: &Connection,
    agent_name: &str,
    decision_type: &str,
) -> ArbiterResult<Vec<Version>> {
    query_versions(
        conn,
        "WHERE agent_name = ?1 AND decision_type = ?2 AND status = 'active'
         ORDER BY rollout_percentage DESC, created_at DESC, rowid DESC",
        &[&agent_name, &decision_type],
    )
}

pub fn find_by_content_hash(
    conn: &Connection,
    agent_name: &str,
    decision_type: &str,
    content_hash: &str,
) -> ArbiterResult<Option<Version>> {
    Ok(query_versions(
        conn,
        "WHERE agent_name = ?1 AND decision_type = ?2 AND content_hash = ?3
         ORDER BY created_at DESC LIMIT 1",
        &[&agent_name, &decision_type, &content_hash],
    )?
    .into_iter()
    .next())
}

pub fn count_active_versions(conn: &Connection, agent_name: &str) -> ArbiterResult<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM versions WHERE agent_name = ?1 AND status = 'active'",
            params![agent_name],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as u64)
}

/// Promote a version to `active` at the given rollout.
///
/// A full rollout archives every other active version of the same
/// (agent, decision type) first, all inside one transaction, so two
/// full-rollout versions are never visible together.
pub fn promote_version(
    conn: &Connection,
    id: &str,
    approver: &str,
    rollout_percentage: u8,
    approved_at: DateTime<Utc>,
) -> ArbiterResult<Version> {
    if rollout_percentage > MAX_PERCENT {
        return Err(ArbiterError::validation(format!(
            "rollout percentage must be within 0..=100, got {rollout_percentage}"
        )));
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut version =
        get_version(&tx, id)?.ok_or_else(|| ArbiterError::not_found("version", id))?;
    if matches!(
        version.status,
        VersionStatus::Archived | VersionStatus::Rejected
    ) {
        return Err(ArbiterError::invalid_state(
            "version",
            id,
            format!("cannot promote a {} version", version.status),
        ));
    }

    let mut archived = Vec::new();
    if rollout_percentage == MAX_PERCENT {
        for other in active_versions(&tx, &version.agent_name, &version.decision_type)? {
            if other.id == version.id {
                continue;
            }
            tx.execute(
                "UPDATE versions SET status = 'archived' WHERE id = ?1 AND status = 'active'",
                params![other.id],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
            AuditLogger::log(
                &tx,
                AuditEntity::Version,
                &other.id,
                AuditOperation::Archive,
                approver,
                serde_json::json!({ "superseded_by": version.id }),
            )?;
            archived.push(other.id);
        }
    }

    tx.execute(
        "UPDATE versions SET status = 'active', rollout_percentage = ?2,
                approved_by = ?3, approved_at = ?4
         WHERE id = ?1",
        params![id, rollout_percentage, approver, fmt_ts(&approved_at)],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    AuditLogger::log(
        &tx,
        AuditEntity::Version,
        id,
        AuditOperation::Promote,
        approver,
        serde_json::json!({
            "from_status": version.status.as_str(),
            "rollout_percentage": rollout_percentage,
            "archived": archived,
        }),
    )?;

    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;

    version.status = VersionStatus::Active;
    version.rollout_percentage = rollout_percentage;
    version.approved_by = Some(approver.to_string());
    version.approved_at = Some(approved_at);
    Ok(version)
}
