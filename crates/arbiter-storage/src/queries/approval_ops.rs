//! Approval queue rows with compare-and-swap status updates.

use rusqlite::{params, Connection, Row};

use arbiter_core::errors::ArbiterResult;
use arbiter_core::models::{ApprovalRequest, AuditEntity, AuditOperation};

use super::codec::{enum_col, fmt_opt_ts, fmt_ts, json_col, opt_ts_col, ts_col};
use crate::audit::AuditLogger;
use crate::to_storage_err;

const REQUEST_COLUMNS: &str = "id, version_id, decision_type, insight_id, experiment_id,
     request_type, priority, change_summary, impact_analysis, risk_assessment, requested_by,
     status, requires_human_review, reviewed_by, reviewed_at, review_notes, approved_rollout,
     created_at";

/// Insert a request and its `submit` audit row.
pub fn insert_request(conn: &Connection, request: &ApprovalRequest) -> ArbiterResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(e.to_string()))?;
    tx.execute(
        &format!(
            "INSERT INTO approval_queue ({REQUEST_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
        ),
        params![
            request.id,
            request.version_id,
            request.decision_type,
            request.insight_id,
            request.experiment_id,
            request.request_type.as_str(),
            request.priority.as_str(),
            request.change_summary,
            request.impact_analysis.to_string(),
            request.risk_assessment,
            request.requested_by,
            request.status.as_str(),
            request.requires_human_review,
            request.reviewed_by,
            fmt_opt_ts(&request.reviewed_at),
            request.review_notes,
            request.approved_rollout,
            fmt_ts(&request.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    AuditLogger::log(
        &tx,
        AuditEntity::ApprovalRequest,
        &request.id,
        AuditOperation::Submit,
        &request.requested_by,
        serde_json::json!({
            "version_id": request.version_id,
            "request_type": request.request_type.as_str(),
            "priority": request.priority.as_str(),
            "requires_human_review": request.requires_human_review,
        }),
    )?;
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn row_to_request(row: &Row<'_>) -> rusqlite::Result<ApprovalRequest> {
    Ok(ApprovalRequest {
        id: row.get(0)?,
        version_id: row.get(1)?,
        decision_type: row.get(2)?,
        insight_id: row.get(3)?,
        experiment_id: row.get(4)?,
        request_type: enum_col(row, 5)?,
        priority: enum_col(row, 6)?,
        change_summary: row.get(7)?,
        impact_analysis: json_col(row, 8)?,
        risk_assessment: row.get(9)?,
        requested_by: row.get(10)?,
        status: enum_col(row, 11)?,
        requires_human_review: row.get(12)?,
        reviewed_by: row.get(13)?,
        reviewed_at: opt_ts_col(row, 14)?,
        review_notes: row.get(15)?,
        approved_rollout: row.get(16)?,
        created_at: ts_col(row, 17)?,
    })
}

pub fn get_request(conn: &Connection, id: &str) -> ArbiterResult<Option<ApprovalRequest>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {REQUEST_COLUMNS} FROM approval_queue WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![id], row_to_request)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.next()
        .transpose()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Write reviewer fields and status only if the stored status and applied
/// rollout still match `expected`, with one audit row for the transition.
pub fn update_request_if(
    conn: &Connection,
    request: &ApprovalRequest,
    expected: &ApprovalRequest,
    operation: AuditOperation,
    actor: &str,
) -> ArbiterResult<bool> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(e.to_string()))?;
    let changed = tx
        .execute(
            "UPDATE approval_queue SET status = ?2, reviewed_by = ?3, reviewed_at = ?4,
                    review_notes = ?5, approved_rollout = ?6
             WHERE id = ?1 AND status = ?7 AND approved_rollout IS ?8",
            params![
                request.id,
                request.status.as_str(),
                request.reviewed_by,
                fmt_opt_ts(&request.reviewed_at),
                request.review_notes,
                request.approved_rollout,
                expected.status.as_str(),
                expected.approved_rollout,
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if changed == 0 {
        return Ok(false);
    }

    AuditLogger::log(
        &tx,
        AuditEntity::ApprovalRequest,
        &request.id,
        operation,
        actor,
        serde_json::json!({
            "from_status": expected.status.as_str(),
            "from_rollout": expected.approved_rollout,
            "to_status": request.status.as_str(),
            "approved_rollout": request.approved_rollout,
            "review_notes": request.review_notes,
        }),
    )?;
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(true)
}

pub fn pending_requests(conn: &Connection) -> ArbiterResult<Vec<ApprovalRequest>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {REQUEST_COLUMNS} FROM approval_queue WHERE status = 'pending'
             ORDER BY CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END,
                      created_at ASC, rowid ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], row_to_request)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
