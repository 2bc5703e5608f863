//! v002: versions, audit_log.

use rusqlite::Connection;

use arbiter_core::errors::ArbiterResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> ArbiterResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS versions (
            id                  TEXT PRIMARY KEY,
            agent_name          TEXT NOT NULL,
            decision_type       TEXT NOT NULL,
            version_label       TEXT NOT NULL,
            variant_label       TEXT,
            config              TEXT NOT NULL DEFAULT '{}',
            status              TEXT NOT NULL DEFAULT 'testing'
                                CHECK (status IN ('testing', 'active', 'archived', 'rejected')),
            rollout_percentage  INTEGER NOT NULL DEFAULT 0
                                CHECK (rollout_percentage BETWEEN 0 AND 100),
            parent_version_id   TEXT REFERENCES versions(id),
            created_by          TEXT NOT NULL,
            approved_by         TEXT,
            approved_at         TEXT,
            notes               TEXT,
            content_hash        TEXT NOT NULL,
            created_at          TEXT NOT NULL,
            UNIQUE(agent_name, decision_type, version_label)
        );

        CREATE INDEX IF NOT EXISTS idx_versions_pair_status
            ON versions(agent_name, decision_type, status);
        CREATE INDEX IF NOT EXISTS idx_versions_hash
            ON versions(agent_name, decision_type, content_hash);

        -- At most one full-rollout active version per (agent, decision type).
        CREATE UNIQUE INDEX IF NOT EXISTS idx_versions_single_full_rollout
            ON versions(agent_name, decision_type)
            WHERE status = 'active' AND rollout_percentage = 100;

        CREATE TABLE IF NOT EXISTS audit_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            entity      TEXT NOT NULL,
            entity_id   TEXT NOT NULL,
            operation   TEXT NOT NULL,
            actor       TEXT NOT NULL,
            details     TEXT NOT NULL DEFAULT '{}',
            timestamp   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
