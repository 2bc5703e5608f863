//! Daily performance snapshots, one row per (agent, date).

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

use arbiter_core::errors::ArbiterResult;
use arbiter_core::models::PerformanceSnapshot;

use super::codec::{date_col, fmt_date, fmt_ts, ts_col};
use crate::to_storage_err;

const SNAPSHOT_COLUMNS: &str = "agent_name, snapshot_date, total_decisions, evaluated_decisions,
     successful_decisions, accuracy, avg_confidence, active_versions, running_experiments,
     updated_at";

/// Insert, or overwrite the existing row for the same agent and date.
pub fn upsert_snapshot(conn: &Connection, snapshot: &PerformanceSnapshot) -> ArbiterResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO performance_snapshots ({SNAPSHOT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(agent_name, snapshot_date) DO UPDATE SET
                total_decisions = excluded.total_decisions,
                evaluated_decisions = excluded.evaluated_decisions,
                successful_decisions = excluded.successful_decisions,
                accuracy = excluded.accuracy,
                avg_confidence = excluded.avg_confidence,
                active_versions = excluded.active_versions,
                running_experiments = excluded.running_experiments,
                updated_at = excluded.updated_at"
        ),
        params![
            snapshot.agent_name,
            fmt_date(&snapshot.snapshot_date),
            snapshot.total_decisions as i64,
            snapshot.evaluated_decisions as i64,
            snapshot.successful_decisions as i64,
            snapshot.accuracy,
            snapshot.avg_confidence,
            snapshot.active_versions as i64,
            snapshot.running_experiments as i64,
            fmt_ts(&snapshot.updated_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn row_to_snapshot(row: &Row<'_>) -> rusqlite::Result<PerformanceSnapshot> {
    Ok(PerformanceSnapshot {
        agent_name: row.get(0)?,
        snapshot_date: date_col(row, 1)?,
        total_decisions: row.get::<_, i64>(2)? as u64,
        evaluated_decisions: row.get::<_, i64>(3)? as u64,
        successful_decisions: row.get::<_, i64>(4)? as u64,
        accuracy: row.get(5)?,
        avg_confidence: row.get(6)?,
        active_versions: row.get::<_, i64>(7)? as u64,
        running_experiments: row.get::<_, i64>(8)? as u64,
        updated_at: ts_col(row, 9)?,
    })
}

pub fn get_snapshot(
    conn: &Connection,
    agent_name: &str,
    date: NaiveDate,
) -> ArbiterResult<Option<PerformanceSnapshot>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM performance_snapshots
             WHERE agent_name = ?1 AND snapshot_date = ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![agent_name, fmt_date(&date)], row_to_snapshot)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.next()
        .transpose()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// All snapshots for an agent, oldest date first.
pub fn list_snapshots(conn: &Connection, agent_name: &str) -> ArbiterResult<Vec<PerformanceSnapshot>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM performance_snapshots
             WHERE agent_name = ?1 ORDER BY snapshot_date ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![agent_name], row_to_snapshot)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
