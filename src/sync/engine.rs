//! Sync orchestration.
//!
//! A pass for one kind runs fetch, read, reconcile, apply and notify in
//! that order. Fetch and apply failures end up in the [`KindOutcome`];
//! only a failure to read the local collection is returned as an error.

use super::reconcile::{index_remote, reconcile};
use super::remote::RemoteSource;
use super::store::{LocalStore, SyncEntity};
use super::types::{KindOutcome, Operation, PassStatus, SyncOutcome, SyncRequest, SyncStats};
use crate::error::Result;
use crate::model::{Event, Project};

/// A reconciled batch, not yet applied.
struct Planned<E> {
    ops: Vec<Operation<E>>,
    outcome: KindOutcome,
}

impl<E> Planned<E> {
    fn needs_apply(&self) -> bool {
        self.outcome.status == PassStatus::Synced
    }
}

/// Drives sync passes between a remote source and a local store.
#[derive(Debug)]
pub struct SyncEngine<R, S> {
    remote: R,
    store: S,
    cross_kind_atomic: bool,
}

impl<R: RemoteSource, S: LocalStore> SyncEngine<R, S> {
    pub fn new(remote: R, store: S) -> Self {
        Self {
            remote,
            store,
            cross_kind_atomic: true,
        }
    }

    /// Commit both kinds in one transaction when the store supports it.
    ///
    /// On by default. Turning it off applies each kind on its own, so one
    /// kind's rejected batch leaves the other kind's changes in place.
    #[must_use]
    pub fn with_cross_kind_atomicity(mut self, enabled: bool) -> Self {
        self.cross_kind_atomic = enabled;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch, read and reconcile one kind.
    async fn plan<E: SyncEntity>(&self) -> Result<Planned<E>> {
        let fetched = match self.remote.fetch_all::<E>().await {
            Ok(fetched) => fetched,
            Err(err) => {
                tracing::warn!(kind = %E::KIND, error = %err, "Remote fetch failed");
                return Ok(Planned {
                    ops: Vec::new(),
                    outcome: KindOutcome::fetch_failed(E::KIND, &err),
                });
            }
        };

        let local = self.store.read_all::<E>().await?;
        let remote_count = fetched.len();
        let ops = reconcile(&local, index_remote(fetched));
        let stats = SyncStats::tally(&ops);

        tracing::debug!(
            kind = %E::KIND,
            local = local.len(),
            remote = remote_count,
            inserts = stats.inserts,
            updates = stats.updates,
            deletes = stats.deletes,
            "Reconciled"
        );

        Ok(Planned {
            ops,
            outcome: KindOutcome::planned(E::KIND, stats),
        })
    }

    /// Run one pass for one kind.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local collection cannot be read.
    pub async fn sync_one<E: SyncEntity>(&self) -> Result<KindOutcome> {
        let planned = self.plan::<E>().await?;
        if !planned.needs_apply() {
            return Ok(planned.outcome);
        }

        let Planned { ops, outcome } = planned;
        match self.store.apply_batch(ops).await {
            Ok(()) => {
                self.store.notify_changed(E::KIND);
                tracing::debug!(kind = %E::KIND, applied = outcome.stats.total(), "Batch applied");
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!(kind = %E::KIND, error = %err, "Batch rejected by store");
                Ok(outcome.apply_failed(err.to_string()))
            }
        }
    }

    /// Plan both kinds, then commit their batches together.
    async fn sync_combined(&self) -> Result<Vec<KindOutcome>> {
        let (projects, events) = tokio::try_join!(self.plan::<Project>(), self.plan::<Event>())?;

        if !projects.needs_apply() && !events.needs_apply() {
            return Ok(vec![projects.outcome, events.outcome]);
        }

        let (project_outcome, event_outcome) = (projects.outcome, events.outcome);
        match self.store.apply_combined(projects.ops, events.ops).await {
            Ok(()) => {
                for outcome in [&project_outcome, &event_outcome] {
                    if outcome.status == PassStatus::Synced {
                        self.store.notify_changed(outcome.kind);
                    }
                }
                Ok(vec![project_outcome, event_outcome])
            }
            Err(err) => {
                tracing::error!(error = %err, "Combined batch rejected by store");
                let message = err.to_string();
                Ok([project_outcome, event_outcome]
                    .into_iter()
                    .map(|outcome| {
                        if outcome.status.is_success() {
                            outcome.apply_failed(message.clone())
                        } else {
                            outcome
                        }
                    })
                    .collect())
            }
        }
    }

    /// Run a pass for every kind and aggregate the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if a local collection cannot be read, including a
    /// stored record this crate could not have written.
    pub async fn run_sync(&self, request: SyncRequest) -> Result<SyncOutcome> {
        tracing::debug!(manual = request.manual, expedited = request.expedited, "Sync started");

        let kinds = if self.cross_kind_atomic && self.store.supports_cross_kind_atomicity() {
            self.sync_combined().await?
        } else {
            let (projects, events) =
                tokio::join!(self.sync_one::<Project>(), self.sync_one::<Event>());
            vec![projects?, events?]
        };

        let outcome = SyncOutcome::from_kinds(request, kinds);
        tracing::info!(
            manual = request.manual,
            entries = outcome.entries_total,
            inserts = outcome.inserts,
            updates = outcome.updates,
            deletes = outcome.deletes,
            io_errors = outcome.io_error_count,
            full_resync = outcome.full_resync_requested,
            storage_error = outcome.storage_error_occurred,
            "Sync finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{EntityKind, ProjectCategory};
    use crate::storage::SqliteStorage;
    use crate::sync::{FetchError, SharedStorage, StaticRemote};

    const PROJECTS: &str = r#"[
        {"id": "p1", "name": "Solar Charger", "category": "power"},
        {"id": "p2", "name": "Mesh Radio", "category": "telecom", "prerequisites": ["RF Basics"]}
    ]"#;

    const EVENTS: &str = r#"[
        {"id": "e1", "name": "Career Fair", "start": "2024-10-01T09:00:00+02:00"}
    ]"#;

    fn store() -> SharedStorage {
        SharedStorage::new(SqliteStorage::open_memory().unwrap())
    }

    fn remote() -> StaticRemote {
        StaticRemote::new()
            .with_payload::<Project>(PROJECTS)
            .with_payload::<Event>(EVENTS)
    }

    fn reject_inserts(store: &SharedStorage, table: &str) {
        store
            .with_storage(|s| {
                s.conn().execute_batch(&format!(
                    "CREATE TRIGGER reject_{table} BEFORE INSERT ON {table}
                     BEGIN SELECT RAISE(ABORT, 'read-only'); END;"
                ))?;
                Ok(())
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_sync_inserts_everything() {
        let store = store();
        let mut changes = store.notifier().subscribe();
        let engine = SyncEngine::new(remote(), store.clone());

        let outcome = engine.run_sync(SyncRequest::manual()).await.unwrap();

        assert_eq!(outcome.inserts, 3);
        assert_eq!(outcome.entries_total, 3);
        assert!(outcome.is_success());
        assert!(outcome.trigger.manual);

        let mut notified = vec![changes.recv().await.unwrap(), changes.recv().await.unwrap()];
        notified.sort_by_key(EntityKind::as_str);
        assert_eq!(notified, [EntityKind::Events, EntityKind::Projects]);

        let projects: Vec<Project> = store.read_all().await.unwrap();
        assert_eq!(projects[1].prerequisites, ["RF Basics"]);
    }

    #[tokio::test]
    async fn test_second_sync_is_up_to_date() {
        let store = store();
        let engine = SyncEngine::new(remote(), store.clone());
        engine.run_sync(SyncRequest::periodic()).await.unwrap();

        let mut changes = store.notifier().subscribe();
        let outcome = engine.run_sync(SyncRequest::periodic()).await.unwrap();

        assert_eq!(outcome.entries_total, 0);
        assert!(outcome
            .kinds
            .iter()
            .all(|k| k.status == PassStatus::UpToDate));
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_timeout_leaves_store_untouched() {
        let store = store();
        let existing = Project::new("p0", "Legacy", ProjectCategory::Software);
        store
            .apply_batch(vec![Operation::Insert(existing.clone())])
            .await
            .unwrap();

        let remote = StaticRemote::new()
            .with_failure::<Project>(FetchError::Timeout("projects".into()))
            .with_payload::<Event>("[]");
        let engine = SyncEngine::new(remote, store.clone());

        let outcome = engine.sync_one::<Project>().await.unwrap();

        assert_eq!(outcome.status, PassStatus::RetryLater);
        assert_eq!(outcome.stats.total(), 0);
        assert_eq!(outcome.io_errors, 1);

        let full = engine.run_sync(SyncRequest::periodic()).await.unwrap();
        assert!(full.full_resync_requested);
        assert!(!full.storage_error_occurred);
        assert_eq!(full.entries_total, 0);

        let projects: Vec<Project> = store.read_all().await.unwrap();
        assert_eq!(projects, vec![existing]);
    }

    #[tokio::test]
    async fn test_malformed_payload_marks_stale() {
        let remote = StaticRemote::new()
            .with_payload::<Project>(r#"[{"id": "p1", "name": "X", "category": "civil"}]"#)
            .with_payload::<Event>(EVENTS);
        let engine = SyncEngine::new(remote, store());

        let outcome = engine.run_sync(SyncRequest::periodic()).await.unwrap();

        assert_eq!(outcome.kind(EntityKind::Projects).unwrap().status, PassStatus::Stale);
        assert_eq!(outcome.kind(EntityKind::Events).unwrap().status, PassStatus::Synced);
        assert_eq!(outcome.io_error_count, 1);
        assert!(outcome.storage_error_occurred);
        assert_eq!(outcome.inserts, 1);
    }

    #[tokio::test]
    async fn test_apply_failure_is_isolated_per_kind() {
        let store = store();
        reject_inserts(&store, "events");
        let mut changes = store.notifier().subscribe();
        let engine = SyncEngine::new(remote(), store.clone()).with_cross_kind_atomicity(false);

        let outcome = engine.run_sync(SyncRequest::periodic()).await.unwrap();

        let events = outcome.kind(EntityKind::Events).unwrap();
        assert_eq!(events.status, PassStatus::ApplyFailed);
        assert!(events.error.as_deref().unwrap().contains("read-only"));
        assert_eq!(outcome.kind(EntityKind::Projects).unwrap().status, PassStatus::Synced);
        assert!(outcome.storage_error_occurred);
        assert_eq!(outcome.entries_total, 2);

        assert_eq!(changes.recv().await.unwrap(), EntityKind::Projects);
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_combined_failure_rolls_back_both_kinds() {
        let store = store();
        reject_inserts(&store, "events");
        let engine = SyncEngine::new(remote(), store.clone());

        let outcome = engine.run_sync(SyncRequest::manual()).await.unwrap();

        assert!(outcome
            .kinds
            .iter()
            .all(|k| k.status == PassStatus::ApplyFailed));
        assert_eq!(outcome.entries_total, 0);
        let projects: Vec<Project> = store.read_all().await.unwrap();
        assert!(projects.is_empty());
    }

    #[tokio::test]
    async fn test_combined_is_the_default_for_capable_stores() {
        let store = store();
        let engine = SyncEngine::new(remote(), store.clone());

        let outcome = engine.run_sync(SyncRequest::manual()).await.unwrap();

        assert_eq!(outcome.entries_total, 3);
        let batches: Vec<String> = store
            .with_storage(|s| s.recent_changes(None, None))
            .unwrap()
            .into_iter()
            .map(|c| c.batch)
            .collect();
        assert!(batches.iter().all(|b| b == "sync_all"));
    }

    #[tokio::test]
    async fn test_per_kind_mode_uses_separate_batches() {
        let store = store();
        let engine = SyncEngine::new(remote(), store.clone()).with_cross_kind_atomicity(false);

        engine.run_sync(SyncRequest::manual()).await.unwrap();

        let mut batches: Vec<String> = store
            .with_storage(|s| s.recent_changes(None, None))
            .unwrap()
            .into_iter()
            .map(|c| c.batch)
            .collect();
        batches.sort();
        batches.dedup();
        assert_eq!(batches, ["sync_events", "sync_projects"]);
    }

    #[tokio::test]
    async fn test_offset_change_rewrites_stored_event() {
        let store = store();
        let first = StaticRemote::new()
            .with_payload::<Project>("[]")
            .with_payload::<Event>(r#"[{"id": "e1", "name": "Demo Day", "start": "2024-05-02T09:30:00+02:00"}]"#);
        SyncEngine::new(first, store.clone())
            .run_sync(SyncRequest::periodic())
            .await
            .unwrap();

        let shifted = StaticRemote::new()
            .with_payload::<Project>("[]")
            .with_payload::<Event>(r#"[{"id": "e1", "name": "Demo Day", "start": "2024-05-02T10:30:00+03:00"}]"#);
        let outcome = SyncEngine::new(shifted, store.clone())
            .run_sync(SyncRequest::periodic())
            .await
            .unwrap();

        assert_eq!(outcome.updates, 1);
        let events: Vec<Event> = store.read_all().await.unwrap();
        assert_eq!(
            events[0].starts_at.unwrap().to_rfc3339(),
            "2024-05-02T10:30:00+03:00"
        );
    }

    #[tokio::test]
    async fn test_corrupt_local_record_fails_run() {
        let store = store();
        store
            .with_storage(|s| {
                s.conn().execute(
                    "INSERT INTO projects (id, name, category) VALUES ('p9', 'Broken', 7)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        let engine = SyncEngine::new(remote(), store);

        let err = engine.run_sync(SyncRequest::periodic()).await.unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { kind: EntityKind::Projects, .. }));
    }

    #[tokio::test]
    async fn test_remote_deletion_and_update() {
        let store = store();
        SyncEngine::new(remote(), store.clone())
            .run_sync(SyncRequest::periodic())
            .await
            .unwrap();

        let changed = StaticRemote::new()
            .with_payload::<Project>(
                r#"[{"id": "p2", "name": "Mesh Radio v2", "category": "telecom"}]"#,
            )
            .with_payload::<Event>(EVENTS);
        let outcome = SyncEngine::new(changed, store.clone())
            .run_sync(SyncRequest::periodic())
            .await
            .unwrap();

        let projects = outcome.kind(EntityKind::Projects).unwrap();
        assert_eq!(
            projects.stats,
            SyncStats {
                inserts: 0,
                updates: 1,
                deletes: 1
            }
        );
        let stored: Vec<Project> = store.read_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Mesh Radio v2");
        assert!(stored[0].prerequisites.is_empty());
    }
}
