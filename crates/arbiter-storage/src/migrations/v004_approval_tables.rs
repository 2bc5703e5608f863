//! v004: approval_queue, review_tasks.

use rusqlite::Connection;

use arbiter_core::errors::ArbiterResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> ArbiterResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS approval_queue (
            id                      TEXT PRIMARY KEY,
            version_id              TEXT NOT NULL REFERENCES versions(id),
            decision_type           TEXT NOT NULL,
            insight_id              TEXT,
            experiment_id           TEXT,
            request_type            TEXT NOT NULL,
            priority                TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high')),
            change_summary          TEXT NOT NULL,
            impact_analysis         TEXT NOT NULL DEFAULT '{}',
            risk_assessment         TEXT NOT NULL DEFAULT '',
            requested_by            TEXT NOT NULL,
            status                  TEXT NOT NULL DEFAULT 'pending'
                                    CHECK (status IN ('pending', 'approved', 'rejected')),
            requires_human_review   INTEGER NOT NULL DEFAULT 0,
            reviewed_by             TEXT,
            reviewed_at             TEXT,
            review_notes            TEXT,
            approved_rollout        INTEGER,
            created_at              TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_approval_status ON approval_queue(status, created_at);
        CREATE INDEX IF NOT EXISTS idx_approval_version ON approval_queue(version_id);

        CREATE TABLE IF NOT EXISTS review_tasks (
            id                  TEXT PRIMARY KEY,
            approval_request_id TEXT NOT NULL REFERENCES approval_queue(id),
            title               TEXT NOT NULL,
            description         TEXT NOT NULL,
            priority            TEXT NOT NULL,
            escalated           INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_review_tasks_request ON review_tasks(approval_request_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
