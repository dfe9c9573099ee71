//! Backend-to-local synchronization.
//!
//! This module mirrors the backend catalogue into the local store:
//!
//! - **Remote**: fetch a complete collection per kind (HTTP + JSON)
//! - **Reconcile**: diff local against remote into an ordered batch
//! - **Store**: apply the batch in one transaction, then notify readers
//! - **Engine**: run both kinds and classify failures into an outcome
//!
//! # Architecture
//!
//! A pass for one kind is strictly sequential:
//! 1. Fetch the remote collection and index it by id
//! 2. Read the local collection
//! 3. Reconcile into insert/update/delete operations
//! 4. Apply the batch atomically (skipped when empty)
//! 5. Notify subscribers of the changed kind
//!
//! The two kinds run concurrently. Fetch and apply failures never escape
//! the engine; they are reported in the [`SyncOutcome`].
//!
//! # Example
//!
//! ```ignore
//! use eeese::sync::{HttpRemote, SharedStorage, SyncEngine, SyncRequest};
//!
//! let remote = HttpRemote::new("http://localhost:8000/api", Duration::from_secs(30))?;
//! let engine = SyncEngine::new(remote, SharedStorage::new(storage));
//! let outcome = engine.run_sync(SyncRequest::manual()).await?;
//! println!("{} changes", outcome.entries_total);
//! ```

mod engine;
mod notify;
mod reconcile;
mod remote;
mod store;
mod types;
mod wire;

pub use engine::SyncEngine;
pub use notify::ChangeNotifier;
pub use reconcile::{index_remote, reconcile, RemoteIndex};
pub use remote::{HttpRemote, RemoteSource, StaticRemote};
pub use store::{LocalStore, SharedStorage, SyncEntity};
pub use types::{
    FetchError, KindOutcome, Operation, PassStatus, SyncOutcome, SyncRequest, SyncStats,
};
pub use wire::{decode_collection, EventWire, ProjectWire, RemoteEntity};
