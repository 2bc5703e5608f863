//! Experiment rows. Updates only ever touch a `running` row.

use rusqlite::{params, Connection, Row};

use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{AuditEntity, AuditOperation, Experiment, ExperimentStatus};

use super::codec::{
    enum_col, fmt_opt_ts, fmt_ts, is_unique_violation, json_col, opt_enum_col, opt_ts_col, ts_col,
};
use crate::audit::AuditLogger;
use crate::to_storage_err;

const EXPERIMENT_COLUMNS: &str = "id, name, description, agent_name, decision_type,
     control_version_id, test_version_id, traffic_split, target_sample_size,
     current_sample_size, metrics, significance, status, winner, started_at, ended_at, expires_at";

pub fn insert_experiment(conn: &Connection, experiment: &Experiment, actor: &str) -> ArbiterResult<()> {
    let metrics = serde_json::to_string(&experiment.metrics)?;
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(e.to_string()))?;
    tx.execute(
        &format!(
            "INSERT INTO experiments ({EXPERIMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            experiment.id,
            experiment.name,
            experiment.description,
            experiment.agent_name,
            experiment.decision_type,
            experiment.control_version_id,
            experiment.test_version_id,
            experiment.traffic_split,
            experiment.target_sample_size as i64,
            experiment.current_sample_size as i64,
            metrics,
            experiment.significance,
            experiment.status.as_str(),
            experiment.winner.map(|w| w.as_str()),
            fmt_ts(&experiment.started_at),
            fmt_opt_ts(&experiment.ended_at),
            fmt_opt_ts(&experiment.expires_at),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            ArbiterError::invalid_state(
                "experiment",
                experiment.id.clone(),
                format!(
                    "an experiment is already running for {}/{}",
                    experiment.agent_name, experiment.decision_type
                ),
            )
        } else {
            to_storage_err(e.to_string())
        }
    })?;
    AuditLogger::log(
        &tx,
        AuditEntity::Experiment,
        &experiment.id,
        AuditOperation::Create,
        actor,
        serde_json::json!({
            "control_version_id": experiment.control_version_id,
            "test_version_id": experiment.test_version_id,
            "traffic_split": experiment.traffic_split,
        }),
    )?;
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn row_to_experiment(row: &Row<'_>) -> rusqlite::Result<Experiment> {
    Ok(Experiment {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        agent_name: row.get(3)?,
        decision_type: row.get(4)?,
        control_version_id: row.get(5)?,
        test_version_id: row.get(6)?,
        traffic_split: row.get(7)?,
        target_sample_size: row.get::<_, i64>(8)? as u64,
        current_sample_size: row.get::<_, i64>(9)? as u64,
        metrics: json_col(row, 10)?,
        significance: row.get(11)?,
        status: enum_col(row, 12)?,
        winner: opt_enum_col(row, 13)?,
        started_at: ts_col(row, 14)?,
        ended_at: opt_ts_col(row, 15)?,
        expires_at: opt_ts_col(row, 16)?,
    })
}

fn query_experiments(
    conn: &Connection,
    sql_tail: &str,
    values: &[&dyn rusqlite::ToSql],
) -> ArbiterResult<Vec<Experiment>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {EXPERIMENT_COLUMNS} FROM experiments {sql_tail}"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(values, row_to_experiment)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn get_experiment(conn: &Connection, id: &str) -> ArbiterResult<Option<Experiment>> {
    Ok(query_experiments(conn, "WHERE id = ?1", &[&id])?.into_iter().next())
}

pub fn running_experiment_for(
    conn: &Connection,
    agent_name: &str,
    decision_type: &str,
) -> ArbiterResult<Option<Experiment>> {
    Ok(query_experiments(
        conn,
        "WHERE agent_name = ?1 AND decision_type = ?2 AND status = 'running'",
        &[&agent_name, &decision_type],
    )?
    .into_iter()
    .next())
}

pub fn running_experiments(conn: &Connection) -> ArbiterResult<Vec<Experiment>> {
    query_experiments(conn, "WHERE status = 'running' ORDER BY started_at ASC", &[])
}

/// Write metrics, status and outcome fields. Returns false if the stored row
/// is no longer running (a concurrent conclude or abort won).
pub fn update_experiment(conn: &Connection, experiment: &Experiment, actor: &str) -> ArbiterResult<bool> {
    let metrics = serde_json::to_string(&experiment.metrics)?;
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(e.to_string()))?;
    let changed = tx
        .execute(
            "UPDATE experiments SET current_sample_size = ?2, metrics = ?3, significance = ?4,
                    status = ?5, winner = ?6, ended_at = ?7
             WHERE id = ?1 AND status = 'running'",
            params![
                experiment.id,
                experiment.current_sample_size as i64,
                metrics,
                experiment.significance,
                experiment.status.as_str(),
                experiment.winner.map(|w| w.as_str()),
                fmt_opt_ts(&experiment.ended_at),
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if changed == 0 {
        return Ok(false);
    }

    let operation = match experiment.status {
        ExperimentStatus::Completed => Some(AuditOperation::Complete),
        ExperimentStatus::Aborted => Some(AuditOperation::Abort),
        ExperimentStatus::Running => None,
    };
    if let Some(operation) = operation {
        AuditLogger::log(
            &tx,
            AuditEntity::Experiment,
            &experiment.id,
            operation,
            actor,
            serde_json::json!({
                "winner": experiment.winner.map(|w| w.as_str()),
                "significance": experiment.significance,
                "current_sample_size": experiment.current_sample_size,
            }),
        )?;
    }
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
    Ok(true)
}

pub fn count_running_experiments(conn: &Connection, agent_name: &str) -> ArbiterResult<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM experiments WHERE agent_name = ?1 AND status = 'running'",
            params![agent_name],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as u64)
}
