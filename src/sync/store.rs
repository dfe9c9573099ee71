//! The sync engine's view of the local store.

use std::future::Future;
use std::sync::{Arc, Mutex};

use super::notify::ChangeNotifier;
use super::types::Operation;
use super::wire::RemoteEntity;
use crate::error::{Error, Result};
use crate::model::{EntityKind, Event, Project};
use crate::storage::{SqliteStorage, StoredEntity};

/// An entity that is both fetched from the backend and stored locally.
pub trait SyncEntity: RemoteEntity + StoredEntity {}

impl<E: RemoteEntity + StoredEntity> SyncEntity for E {}

/// Local persistence as seen by [`SyncEngine`](super::SyncEngine).
pub trait LocalStore: Send + Sync {
    /// Every stored entity of one kind.
    fn read_all<E: SyncEntity>(&self) -> impl Future<Output = Result<Vec<E>>> + Send;

    /// Apply one kind's batch atomically.
    fn apply_batch<E: SyncEntity>(
        &self,
        ops: Vec<Operation<E>>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Apply both kinds' batches in one transaction.
    ///
    /// Only called when [`supports_cross_kind_atomicity`](Self::supports_cross_kind_atomicity)
    /// returns true.
    fn apply_combined(
        &self,
        projects: Vec<Operation<Project>>,
        events: Vec<Operation<Event>>,
    ) -> impl Future<Output = Result<()>> + Send {
        let _ = (projects, events);
        std::future::ready(Err(Error::Sync(
            "store cannot apply batches across kinds".to_string(),
        )))
    }

    fn supports_cross_kind_atomicity(&self) -> bool {
        false
    }

    /// Tell readers that a kind's table changed.
    fn notify_changed(&self, kind: EntityKind);
}

/// [`SqliteStorage`] shared between the engine and its callers.
///
/// The mutex serialises batches; SQLite work runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct SharedStorage {
    inner: Arc<Mutex<SqliteStorage>>,
    notifier: ChangeNotifier,
}

impl SharedStorage {
    #[must_use]
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
            notifier: ChangeNotifier::new(),
        }
    }

    #[must_use]
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Run `f` against the storage on the current thread.
    ///
    /// # Errors
    ///
    /// Returns `f`'s error, or `Error::Other` if the mutex is poisoned.
    pub fn with_storage<R>(&self, f: impl FnOnce(&mut SqliteStorage) -> Result<R>) -> Result<R> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| Error::Other("storage mutex poisoned".to_string()))?;
        f(&mut guard)
    }

    async fn run_blocking<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut SqliteStorage) -> Result<R> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.with_storage(f))
            .await
            .map_err(|e| Error::Other(format!("storage task failed: {e}")))?
    }
}

impl LocalStore for SharedStorage {
    async fn read_all<E: SyncEntity>(&self) -> Result<Vec<E>> {
        self.run_blocking(|storage| storage.read_all::<E>()).await
    }

    async fn apply_batch<E: SyncEntity>(&self, ops: Vec<Operation<E>>) -> Result<()> {
        self.run_blocking(move |storage| storage.apply_batch(&ops))
            .await
    }

    async fn apply_combined(
        &self,
        projects: Vec<Operation<Project>>,
        events: Vec<Operation<Event>>,
    ) -> Result<()> {
        self.run_blocking(move |storage| storage.apply_combined(&projects, &events))
            .await
    }

    fn supports_cross_kind_atomicity(&self) -> bool {
        true
    }

    fn notify_changed(&self, kind: EntityKind) {
        self.notifier.notify(kind);
    }
}
