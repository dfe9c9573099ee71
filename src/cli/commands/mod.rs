//! Command implementations.

pub mod event;
pub mod project;
pub mod status;
pub mod sync;
pub mod version;
pub mod watch;

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use std::path::PathBuf;

fn resolve(db_path: Option<&PathBuf>) -> Result<PathBuf> {
    resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Cannot determine a data directory; pass --db".to_string()))
}

/// Open the database for a read command.
///
/// Never creates a database: browsing before the first sync is an error.
pub(crate) fn open_existing(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let path = resolve(db_path)?;
    if !path.exists() {
        return Err(Error::NotInitialized { path });
    }
    SqliteStorage::open(&path)
}

/// Open the database for a sync, creating it and its directory if needed.
pub(crate) fn open_or_create(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let path = resolve(db_path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    tracing::debug!(path = %path.display(), "Opening database");
    SqliteStorage::open(&path)
}
