//! Decision + outcome inserts and range reads. No update or delete exists.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection, Row};

use arbiter_core::errors::{ArbiterError, ArbiterResult};
use arbiter_core::models::{
    Confidence, Decision, DecisionQuery, DecisionRecord, Outcome, OutcomeScore,
};

use super::codec::{
    enum_col, fmt_ts, is_foreign_key_violation, json_col, opt_json_col, ts_col,
};
use crate::to_storage_err;

const DECISION_COLUMNS: &str = "id, agent_name, decision_type, context, decision_made, rationale,
     confidence, version_label, variant_label, input, output, created_at";

const OUTCOME_COLUMNS: &str =
    "id, decision_id, outcome_type, value, data, source, notes, created_at";

pub fn insert_decision(conn: &Connection, decision: &Decision) -> ArbiterResult<()> {
    conn.execute(
        &format!("INSERT INTO decisions ({DECISION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
        params![
            decision.id,
            decision.agent_name,
            decision.decision_type,
            decision.context.to_string(),
            decision.decision_made,
            decision.rationale,
            decision.confidence.map(Confidence::value),
            decision.version_label,
            decision.variant_label,
            decision.input.as_ref().map(|v| v.to_string()),
            decision.output.as_ref().map(|v| v.to_string()),
            fmt_ts(&decision.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Insert an outcome. The foreign key on `decision_id` is the existence check.
pub fn insert_outcome(conn: &Connection, outcome: &Outcome) -> ArbiterResult<()> {
    conn.execute(
        &format!("INSERT INTO outcomes ({OUTCOME_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            outcome.id,
            outcome.decision_id,
            outcome.outcome_type,
            outcome.value.map(OutcomeScore::value),
            outcome.data.to_string(),
            outcome.source.as_str(),
            outcome.notes,
            fmt_ts(&outcome.created_at),
        ],
    )
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            ArbiterError::not_found("decision", outcome.decision_id.clone())
        } else {
            to_storage_err(e.to_string())
        }
    })?;
    Ok(())
}

fn row_to_decision(row: &Row<'_>) -> rusqlite::Result<Decision> {
    Ok(Decision {
        id: row.get(0)?,
        agent_name: row.get(1)?,
        decision_type: row.get(2)?,
        context: json_col(row, 3)?,
        decision_made: row.get(4)?,
        rationale: row.get(5)?,
        confidence: row.get::<_, Option<f64>>(6)?.map(Confidence::new),
        version_label: row.get(7)?,
        variant_label: row.get(8)?,
        input: opt_json_col(row, 9)?,
        output: opt_json_col(row, 10)?,
        created_at: ts_col(row, 11)?,
    })
}

fn row_to_outcome(row: &Row<'_>) -> rusqlite::Result<Outcome> {
    Ok(Outcome {
        id: row.get(0)?,
        decision_id: row.get(1)?,
        outcome_type: row.get(2)?,
        value: row.get::<_, Option<f64>>(3)?.map(OutcomeScore::new),
        data: json_col(row, 4)?,
        source: enum_col(row, 5)?,
        notes: row.get(6)?,
        created_at: ts_col(row, 7)?,
    })
}

pub fn get_decision(conn: &Connection, id: &str) -> ArbiterResult<Option<DecisionRecord>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {DECISION_COLUMNS} FROM decisions WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![id], row_to_decision)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let decision = match rows.next() {
        Some(row) => row.map_err(|e| to_storage_err(e.to_string()))?,
        None => return Ok(None),
    };
    let outcomes = outcomes_for(conn, id)?;
    Ok(Some(DecisionRecord { decision, outcomes }))
}

/// Outcomes of one decision, oldest first.
pub fn outcomes_for(conn: &Connection, decision_id: &str) -> ArbiterResult<Vec<Outcome>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {OUTCOME_COLUMNS} FROM outcomes WHERE decision_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![decision_id], row_to_outcome)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// WHERE clause + bound values for a decision filter.
fn filter_clause(query: &DecisionQuery) -> (String, Vec<String>) {
    let mut clauses = vec!["agent_name = ?".to_string(), "created_at >= ?".to_string()];
    let mut values = vec![query.agent_name.clone(), fmt_ts(&query.from)];
    if let Some(to) = &query.to {
        clauses.push("created_at < ?".to_string());
        values.push(fmt_ts(to));
    }
    if let Some(decision_type) = &query.decision_type {
        clauses.push("decision_type = ?".to_string());
        values.push(decision_type.clone());
    }
    if let Some(label) = &query.version_label {
        clauses.push("version_label = ?".to_string());
        values.push(label.clone());
    }
    (clauses.join(" AND "), values)
}

/// Decisions matching `query`, oldest first, each with its outcomes.
pub fn query_decisions(
    conn: &Connection,
    query: &DecisionQuery,
) -> ArbiterResult<Vec<DecisionRecord>> {
    let (clause, values) = filter_clause(query);

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {DECISION_COLUMNS} FROM decisions WHERE {clause}
             ORDER BY created_at ASC, rowid ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let decisions = stmt
        .query_map(params_from_iter(values.iter()), row_to_decision)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    if decisions.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {OUTCOME_COLUMNS} FROM outcomes
             WHERE decision_id IN (SELECT id FROM decisions WHERE {clause})
             ORDER BY created_at ASC, rowid ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let outcomes = stmt
        .query_map(params_from_iter(values.iter()), row_to_outcome)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut by_decision: HashMap<String, Vec<Outcome>> = HashMap::new();
    for outcome in outcomes {
        let outcome = outcome.map_err(|e| to_storage_err(e.to_string()))?;
        by_decision
            .entry(outcome.decision_id.clone())
            .or_default()
            .push(outcome);
    }

    Ok(decisions
        .into_iter()
        .map(|decision| {
            let outcomes = by_decision.remove(&decision.id).unwrap_or_default();
            DecisionRecord { decision, outcomes }
        })
        .collect())
}

/// Total number of decisions in the ledger.
pub fn count_decisions(conn: &Connection) -> ArbiterResult<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM decisions", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as u64)
}
