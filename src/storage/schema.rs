//! Database schema definitions.
//!
//! Catalogue tables hold exactly the fields of the synced entities; the
//! backend id is the primary key. `change_log` and `sync_runs` are local
//! bookkeeping and are never reconciled.

use rusqlite::{Connection, Result};

/// Current schema version, stored in `PRAGMA user_version`.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema.
///
/// Timestamps of local bookkeeping are INTEGER (Unix milliseconds); event
/// times are RFC 3339 TEXT so their offsets survive a round trip.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Catalogue Tables
-- ====================

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    head TEXT,
    description TEXT,
    category INTEGER NOT NULL,
    prerequisites TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_projects_category ON projects(category);

CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    image_uri TEXT,
    longitude TEXT,
    latitude TEXT,
    starts_at TEXT,
    ends_at TEXT
);

-- ====================
-- Bookkeeping
-- ====================

-- One row per operation applied by a sync batch
CREATE TABLE IF NOT EXISTS change_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_kind TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    change_type TEXT NOT NULL,
    batch TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_change_log_kind ON change_log(entity_kind, created_at DESC);

-- One row per pass per entity kind
CREATE TABLE IF NOT EXISTS sync_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_kind TEXT NOT NULL,
    status TEXT NOT NULL,
    inserts INTEGER NOT NULL DEFAULT 0,
    updates INTEGER NOT NULL DEFAULT 0,
    deletes INTEGER NOT NULL DEFAULT 0,
    io_errors INTEGER NOT NULL DEFAULT 0,
    error TEXT,
    manual INTEGER NOT NULL DEFAULT 0,
    finished_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sync_runs_kind ON sync_runs(entity_kind, finished_at DESC);
";

/// Apply the schema to a connection.
///
/// Idempotent. A database written by a newer schema version is left alone
/// and reported through `tracing` instead of being downgraded.
///
/// # Errors
///
/// Returns an error if any DDL statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version < CURRENT_SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    } else if version > CURRENT_SCHEMA_VERSION {
        tracing::warn!(
            found = version,
            expected = CURRENT_SCHEMA_VERSION,
            "Database schema is newer than this binary"
        );
    }

    Ok(())
}
