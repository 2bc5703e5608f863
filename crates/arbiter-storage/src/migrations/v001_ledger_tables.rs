//! v001: decisions and outcomes, the append-only ledger.

use rusqlite::Connection;

use arbiter_core::errors::ArbiterResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> ArbiterResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS decisions (
            id              TEXT PRIMARY KEY,
            agent_name      TEXT NOT NULL,
            decision_type   TEXT NOT NULL,
            context         TEXT NOT NULL DEFAULT '{}',
            decision_made   TEXT NOT NULL,
            rationale       TEXT NOT NULL DEFAULT '',
            confidence      REAL CHECK (confidence IS NULL OR (confidence >= 0.0 AND confidence <= 1.0)),
            version_label   TEXT,
            variant_label   TEXT,
            input           TEXT,
            output          TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_decisions_agent_type_time
            ON decisions(agent_name, decision_type, created_at);
        CREATE INDEX IF NOT EXISTS idx_decisions_agent_version_time
            ON decisions(agent_name, version_label, created_at);

        CREATE TABLE IF NOT EXISTS outcomes (
            id              TEXT PRIMARY KEY,
            decision_id     TEXT NOT NULL REFERENCES decisions(id),
            outcome_type    TEXT NOT NULL,
            value           REAL CHECK (value IS NULL OR (value >= 0.0 AND value <= 100.0)),
            data            TEXT NOT NULL DEFAULT '{}',
            source          TEXT NOT NULL,
            notes           TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_outcomes_decision ON outcomes(decision_id, created_at);

        CREATE TRIGGER IF NOT EXISTS decisions_no_update BEFORE UPDATE ON decisions
        BEGIN SELECT RAISE(ABORT, 'decisions are append-only'); END;
        CREATE TRIGGER IF NOT EXISTS decisions_no_delete BEFORE DELETE ON decisions
        BEGIN SELECT RAISE(ABORT, 'decisions are append-only'); END;
        CREATE TRIGGER IF NOT EXISTS outcomes_no_update BEFORE UPDATE ON outcomes
        BEGIN SELECT RAISE(ABORT, 'outcomes are append-only'); END;
        CREATE TRIGGER IF NOT EXISTS outcomes_no_delete BEFORE DELETE ON outcomes
        BEGIN SELECT RAISE(ABORT, 'outcomes are append-only'); END;
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
