//! v003: experiments.

use rusqlite::Connection;

use arbiter_core::errors::ArbiterResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> ArbiterResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS experiments (
            id                  TEXT PRIMARY KEY,
            name                TEXT NOT NULL,
            description         TEXT,
            agent_name          TEXT NOT NULL,
            decision_type       TEXT NOT NULL,
            control_version_id  TEXT NOT NULL REFERENCES versions(id),
            test_version_id     TEXT NOT NULL REFERENCES versions(id),
            traffic_split       INTEGER NOT NULL CHECK (traffic_split BETWEEN 0 AND 100),
            target_sample_size  INTEGER NOT NULL CHECK (target_sample_size > 0),
            current_sample_size INTEGER NOT NULL DEFAULT 0,
            metrics             TEXT NOT NULL DEFAULT '{}',
            significance        REAL,
            status              TEXT NOT NULL DEFAULT 'running'
                                CHECK (status IN ('running', 'completed', 'aborted')),
            winner              TEXT CHECK (winner IS NULL OR winner IN ('control', 'test', 'inconclusive')),
            started_at          TEXT NOT NULL,
            ended_at            TEXT,
            expires_at          TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_experiments_status ON experiments(status);

        -- At most one running experiment per (agent, decision type).
        CREATE UNIQUE INDEX IF NOT EXISTS idx_experiments_single_running
            ON experiments(agent_name, decision_type)
            WHERE status = 'running';
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
