//! v005: learning_insights, performance_snapshots.

use rusqlite::Connection;

use arbiter_core::errors::ArbiterResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> ArbiterResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS learning_insights (
            id                  TEXT PRIMARY KEY,
            agent_name          TEXT NOT NULL,
            decision_type       TEXT,
            period_start        TEXT NOT NULL,
            period_end          TEXT NOT NULL,
            total_decisions     INTEGER NOT NULL,
            avg_confidence      REAL,
            metrics             TEXT NOT NULL,
            patterns            TEXT NOT NULL DEFAULT '[]',
            suggestions         TEXT NOT NULL DEFAULT '[]',
            proposed_variants   TEXT NOT NULL DEFAULT '[]',
            summary             TEXT NOT NULL DEFAULT '',
            analysis_status     TEXT NOT NULL,
            spawned_version_ids TEXT NOT NULL DEFAULT '[]',
            spawned_request_ids TEXT NOT NULL DEFAULT '[]',
            created_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_insights_agent ON learning_insights(agent_name, period_end);

        CREATE TABLE IF NOT EXISTS performance_snapshots (
            agent_name              TEXT NOT NULL,
            snapshot_date           TEXT NOT NULL,
            total_decisions         INTEGER NOT NULL,
            evaluated_decisions     INTEGER NOT NULL,
            successful_decisions    INTEGER NOT NULL,
            accuracy                REAL NOT NULL,
            avg_confidence          REAL,
            active_versions         INTEGER NOT NULL,
            running_experiments     INTEGER NOT NULL,
            updated_at              TEXT NOT NULL,
            PRIMARY KEY (agent_name, snapshot_date)
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
