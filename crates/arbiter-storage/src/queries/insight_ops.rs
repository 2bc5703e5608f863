//! Learning insight rows. Insights are written once and never updated.

use rusqlite::{params, Connection, Row};

use arbiter_core::constants::SYSTEM_ACTOR;
use arbiter_core::errors::ArbiterResult;
use arbiter_core::models::{AuditEntity, AuditOperation, LearningInsight};

use super::codec::{enum_col, fmt_ts, json_col, ts_col};
use crate::audit::AuditLogger;
use crate::to_storage_err;

const INSIGHT_COLUMNS: &str = "id, agent_name, decision_type, period_start, period_end,
     total_decisions, avg_confidence, metrics, patterns, suggestions, proposed_variants,
     summary, analysis_status, spawned_version_ids, spawned_request_ids, created_at";

pub fn insert_insight(conn: &Connection, insight: &LearningInsight) -> ArbiterResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(e.to_string()))?;
    tx.execute(
        &format!(
            "INSERT INTO learning_insights ({INSIGHT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        ),
        params![
            insight.id,
            insight.agent_name,
            insight.decision_type,
            fmt_ts(&insight.period_start),
            fmt_ts(&insight.period_end),
            insight.total_decisions as i64,
            insight.avg_confidence,
            serde_json::to_string(&insight.metrics)?,
            serde_json::to_string(&insight.patterns)?,
            serde_json::to_string(&insight.suggestions)?,
            serde_json::to_string(&insight.proposed_variants)?,
            insight.summary,
            insight.analysis_status.as_str(),
            serde_json::to_string(&insight.spawned_version_ids)?,
            serde_json::to_string(&insight.spawned_request_ids)?,
            fmt_ts(&insight.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    AuditLogger::log(
        &tx,
        AuditEntity::Insight,
        &insight.id,
        AuditOperation::Create,
        SYSTEM_ACTOR,
        serde_json::json!({
            "analysis_status": insight.analysis_status.as_str(),
            "total_decisions": insight.total_decisions,
            "spawned_versions": insight.spawned_version_ids.len(),
        }),
    )?;
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn row_to_insight(row: &Row<'_>) -> rusqlite::Result<LearningInsight> {
    Ok(LearningInsight {
        id: row.get(0)?,
        agent_name: row.get(1)?,
        decision_type: row.get(2)?,
        period_start: ts_col(row, 3)?,
        period_end: ts_col(row, 4)?,
        total_decisions: row.get::<_, i64>(5)? as u64,
        avg_confidence: row.get(6)?,
        metrics: json_col(row, 7)?,
        patterns: json_col(row, 8)?,
        suggestions: json_col(row, 9)?,
        proposed_variants: json_col(row, 10)?,
        summary: row.get(11)?,
        analysis_status: enum_col(row, 12)?,
        spawned_version_ids: json_col(row, 13)?,
        spawned_request_ids: json_col(row, 14)?,
        created_at: ts_col(row, 15)?,
    })
}

pub fn get_insight(conn: &Connection, id: &str) -> ArbiterResult<Option<LearningInsight>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {INSIGHT_COLUMNS} FROM learning_insights WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![id], row_to_insight)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.next()
        .transpose()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Most recent insights for an agent, newest first.
pub fn recent_insights(
    conn: &Connection,
    agent_name: &str,
    limit: usize,
) -> ArbiterResult<Vec<LearningInsight>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM learning_insights WHERE agent_name = ?1
             ORDER BY created_at DESC LIMIT ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![agent_name, limit as i64], row_to_insight)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
