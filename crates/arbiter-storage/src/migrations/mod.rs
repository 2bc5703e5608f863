//! Versioned schema migrations, applied in order inside one transaction each
//! and tracked in `schema_version`.

mod v001_ledger_tables;
mod v002_version_tables;
mod v003_experiment_tables;
mod v004_approval_tables;
mod v005_insight_tables;

use rusqlite::Connection;
use tracing::info;

use arbiter_core::errors::{ArbiterError, ArbiterResult, StorageError};

use crate::to_storage_err;

type MigrationFn = fn(&Connection) -> ArbiterResult<()>;

const MIGRATIONS: &[(u32, &str, MigrationFn)] = &[
    (1, "ledger_tables", v001_ledger_tables::migrate),
    (2, "version_tables", v002_version_tables::migrate),
    (3, "experiment_tables", v003_experiment_tables::migrate),
    (4, "approval_tables", v004_approval_tables::migrate),
    (5, "insight_tables", v005_insight_tables::migrate),
];

/// Latest schema version this build knows about.
pub const LATEST_VERSION: u32 = 5;

/// Apply every pending migration. Returns the resulting schema version.
pub fn run_migrations(conn: &Connection) -> ArbiterResult<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version     INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            applied_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let mut current = current_version(conn)?;
    for (version, name, migrate) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| to_storage_err(e.to_string()))?;
        migrate(&tx).map_err(|e| {
            ArbiterError::StorageError(StorageError::MigrationFailed {
                version: *version,
                reason: e.to_string(),
            })
        })?;
        tx.execute(
            "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
            rusqlite::params![version, name],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
        info!(version, name, "applied migration");
        current = *version;
    }
    Ok(current)
}

/// Highest applied migration, 0 on a fresh database.
pub fn current_version(conn: &Connection) -> ArbiterResult<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
