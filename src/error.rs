//! Error types for the eeese crate.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Remote fetch failures have their own type, [`crate::sync::FetchError`],
//! because the sync engine converts them into pass outcomes instead of
//! propagating them.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::EntityKind;

/// Result type alias for eeese operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    DatabaseError,
    CorruptRecord,

    // Not Found (exit 3)
    ProjectNotFound,
    EventNotFound,

    // Validation (exit 4)
    InvalidCategory,
    InvalidArgument,

    // Sync (exit 6)
    SyncError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::CorruptRecord => "CORRUPT_RECORD",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::EventNotFound => "EVENT_NOT_FOUND",
            Self::InvalidCategory => "INVALID_CATEGORY",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::SyncError => "SYNC_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::DatabaseError | Self::CorruptRecord => 2,
            Self::ProjectNotFound | Self::EventNotFound => 3,
            Self::InvalidCategory | Self::InvalidArgument => 4,
            Self::SyncError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying (possibly with corrected input) can succeed.
    ///
    /// Database errors are usually lock contention with a concurrent pass.
    /// Corrupt records never heal by retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidCategory | Self::InvalidArgument | Self::DatabaseError | Self::SyncError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in eeese operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: no local database at {path} (run `eeese sync` first)")]
    NotInitialized { path: PathBuf },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String, similar: Vec<String> },

    #[error("Event not found: {id}")]
    EventNotFound { id: String, similar: Vec<String> },

    #[error("Invalid category: {input}")]
    InvalidCategory { input: String, suggestion: Option<String> },

    /// A stored row that this crate's own encoder could not have written.
    #[error("Corrupt {kind} record {id}: {reason}")]
    CorruptRecord {
        kind: EntityKind,
        id: String,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::CorruptRecord { .. } => ErrorCode::CorruptRecord,
            Self::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            Self::EventNotFound { .. } => ErrorCode::EventNotFound,
            Self::InvalidCategory { .. } => ErrorCode::InvalidCategory,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Sync(_) => ErrorCode::SyncError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized { .. } => Some(
                "Run `eeese sync` to fetch the catalogue, or pass --db to point at an existing database"
                    .to_string(),
            ),

            Self::ProjectNotFound { id, similar } => Some(not_found_hint(id, similar, "projects")),

            Self::EventNotFound { id, similar } => Some(not_found_hint(id, similar, "events")),

            Self::InvalidCategory { suggestion, .. } => {
                let valid = "Valid categories: software, power, telecom, electronics-control";
                Some(match suggestion {
                    Some(s) => format!("Did you mean '{s}'? {valid}"),
                    None => valid.to_string(),
                })
            }

            Self::CorruptRecord { .. } => Some(
                "The local database holds data this version never writes. \
                 Delete it and run `eeese sync` to rebuild it from the backend."
                    .to_string(),
            ),

            Self::Sync(_) => Some("Check the backend URL (--backend-url / EEESE_BACKEND_URL)".to_string()),

            Self::Database(_) | Self::Io(_) | Self::Json(_) | Self::InvalidArgument(_)
            | Self::Config(_) | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

fn not_found_hint(id: &str, similar: &[String], command: &str) -> String {
    if similar.is_empty() {
        format!("No {command} entry with ID '{id}'. Use `eeese {command} list` to see what is stored.")
    } else {
        format!("Did you mean: {}?", similar.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(
            Error::ProjectNotFound {
                id: "p1".into(),
                similar: vec![],
            }
            .exit_code(),
            3
        );
        assert_eq!(Error::InvalidArgument("x".into()).exit_code(), 4);
        assert_eq!(
            Error::CorruptRecord {
                kind: EntityKind::Projects,
                id: "p1".into(),
                reason: "unknown category 9".into(),
            }
            .exit_code(),
            2
        );
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::InvalidCategory {
            input: "sofware".into(),
            suggestion: Some("software".into()),
        };
        let json = err.to_structured_json();

        assert_eq!(json["error"]["code"], "INVALID_CATEGORY");
        assert_eq!(json["error"]["retryable"], true);
        assert!(
            json["error"]["hint"]
                .as_str()
                .unwrap()
                .contains("Did you mean 'software'?")
        );
    }

    #[test]
    fn test_not_found_hint_lists_similar_ids() {
        let err = Error::EventNotFound {
            id: "e-10".into(),
            similar: vec!["e-1".into(), "e-11".into()],
        };
        assert_eq!(err.hint().unwrap(), "Did you mean: e-1, e-11?");
    }

    #[test]
    fn test_corrupt_record_is_not_retryable() {
        assert!(!ErrorCode::CorruptRecord.is_retryable());
    }
}
