//! SQLite storage layer for the local catalogue.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic sync batches
//! - A change log written in the same transaction as each batch
//!
//! # Submodules
//!
//! - [`events`] - Change log storage
//! - [`records`] - Row codecs for projects and events
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod events;
pub mod records;
pub mod schema;
pub mod sqlite;

pub use events::{ChangeEvent, ChangeType};
pub use records::StoredEntity;
pub use sqlite::{MutationContext, SqliteStorage, SyncRun};
