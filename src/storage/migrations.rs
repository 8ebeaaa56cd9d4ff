//! Schema migrations, tracked with `PRAGMA user_version`

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 2;

const MIGRATIONS: &[(u32, &str)] = &[
    (
        1,
        "CREATE TABLE IF NOT EXISTS packages (
            id TEXT PRIMARY KEY,
            space_id TEXT NOT NULL,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            deleted_by TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_packages_space ON packages(space_id, deleted_at);

        CREATE TABLE IF NOT EXISTS package_members (
            package_id TEXT NOT NULL REFERENCES packages(id),
            kind TEXT NOT NULL,
            artefact_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (package_id, kind, artefact_id)
        );
        CREATE INDEX IF NOT EXISTS idx_package_members_artefact
            ON package_members(artefact_id);",
    ),
    (
        2,
        "CREATE TABLE IF NOT EXISTS packages_deployments (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            target_id TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            payload_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_deployments_target
            ON packages_deployments(organization_id, target_id, created_at);",
    ),
];

/// Apply pending migrations and return the resulting schema version.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    let current: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!(version, "Applied schema migration");
    }
    Ok(SCHEMA_VERSION.max(current))
}
