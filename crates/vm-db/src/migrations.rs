//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order. A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;
use vm_core::{Error, Result};

/// V1: libraries and items.
///
/// `primary_version_id` deliberately has no foreign key: a reference to a
/// primary that was since removed is a state the engine must tolerate.
const V1_INITIAL: &str = r#"
CREATE TABLE libraries (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    media_type TEXT NOT NULL,
    paths      TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE items (
    id                 TEXT PRIMARY KEY,
    library_id         TEXT NOT NULL REFERENCES libraries(id) ON DELETE CASCADE,
    item_kind          TEXT NOT NULL,
    name               TEXT NOT NULL,
    path               TEXT NOT NULL,
    provider_ids       TEXT NOT NULL DEFAULT '{}',
    production_year    INTEGER,
    series_name        TEXT,
    season_name        TEXT,
    index_number       INTEGER,
    is_virtual         INTEGER NOT NULL DEFAULT 0,
    video_type         TEXT NOT NULL DEFAULT 'video_file',
    video_3d_format    TEXT,
    video_width        INTEGER,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE INDEX idx_items_library_id ON items(library_id);
CREATE INDEX idx_items_kind       ON items(item_kind);
"#;

/// V2: version-linkage columns and the library enable flag.
const V2_VERSION_LINKAGE: &str = r#"
ALTER TABLE items ADD COLUMN primary_version_id TEXT;
ALTER TABLE items ADD COLUMN alternate_versions TEXT NOT NULL DEFAULT '[]';
ALTER TABLE libraries ADD COLUMN enabled INTEGER NOT NULL DEFAULT 1;

CREATE INDEX idx_items_primary_version ON items(primary_version_id);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_VERSION_LINKAGE)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        tracing::debug!(version, "Applied migration");
    }

    Ok(())
}
