//! Review tasks backing the built-in review queue.

use rusqlite::{params, Connection, Row};

use arbiter_core::errors::ArbiterResult;
use arbiter_core::models::ReviewTask;

use super::codec::{enum_col, fmt_ts, ts_col};
use crate::to_storage_err;

pub fn insert_task(conn: &Connection, task: &ReviewTask) -> ArbiterResult<()> {
    conn.execute(
        "INSERT INTO review_tasks (id, approval_request_id, title, description, priority, escalated, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            task.id,
            task.approval_request_id,
            task.title,
            task.description,
            task.priority.as_str(),
            task.escalated,
            fmt_ts(&task.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<ReviewTask> {
    Ok(ReviewTask {
        id: row.get(0)?,
        approval_request_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: enum_col(row, 4)?,
        escalated: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}

/// Tasks whose request is still pending, escalated first.
pub fn open_tasks(conn: &Connection) -> ArbiterResult<Vec<ReviewTask>> {
    let mut stmt = conn
        .prepare(
            "SELECT t.id, t.approval_request_id, t.title, t.description, t.priority,
                    t.escalated, t.created_at
             FROM review_tasks t
             JOIN approval_queue q ON q.id = t.approval_request_id
             WHERE q.status = 'pending'
             ORDER BY t.escalated DESC, t.created_at ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], row_to_task)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn tasks_for_request(conn: &Connection, request_id: &str) -> ArbiterResult<Vec<ReviewTask>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, approval_request_id, title, description, priority, escalated, created_at
             FROM review_tasks WHERE approval_request_id = ?1 ORDER BY created_at ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![request_id], row_to_task)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
