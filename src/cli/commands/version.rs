//! Version command implementation.
//!
//! Besides the crate version, reports the schema version this build writes
//! and where the catalogue would be stored, which is what a bug report needs.

use crate::config::{resolve_backend_url, resolve_db_path};
use crate::error::Result;
use crate::storage::schema::CURRENT_SCHEMA_VERSION;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct VersionInfo {
    version: &'static str,
    profile: &'static str,
    schema_version: i32,
    database: Option<PathBuf>,
    backend_url: Option<String>,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let info = VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        profile: if cfg!(debug_assertions) { "dev" } else { "release" },
        schema_version: CURRENT_SCHEMA_VERSION,
        database: resolve_db_path(db_path.map(PathBuf::as_path)),
        // An invalid URL in the environment is reported by `sync`, not here
        backend_url: resolve_backend_url(None).ok(),
    };

    if json {
        println!("{}", serde_json::to_string(&info)?);
        return Ok(());
    }

    println!(
        "eeese {} ({}, schema v{})",
        info.version, info.profile, info.schema_version
    );
    if let Some(db) = &info.database {
        println!("  database: {}", db.display());
    }
    if let Some(url) = &info.backend_url {
        println!("  backend:  {url}");
    }
    Ok(())
}
