//! SQLite storage implementation.
//!
//! This module provides the local catalogue store. Every write goes through
//! [`SqliteStorage::mutate`], which runs inside one IMMEDIATE transaction and
//! appends a change-log row per applied operation before committing.

use crate::error::Result;
use crate::model::{Entity, EntityKind, Event, Project, ProjectCategory};
use crate::storage::events::{
    insert_change, prune_changes, recent_changes, ChangeEvent, ChangeType,
};
use crate::storage::records::StoredEntity;
use crate::storage::schema::apply_schema;
use crate::sync::Operation;
use chrono::{DateTime, FixedOffset};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for another process's lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Change-log rows kept per entity kind.
pub const CHANGE_LOG_RETENTION: u32 = 1_000;

/// Sync-run rows kept per entity kind.
pub const SYNC_RUN_RETENTION: u32 = 200;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation, collecting the change-log rows it produces.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Changes to write at the end of the transaction.
    pub changes: Vec<ChangeEvent>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            changes: Vec::new(),
        }
    }

    /// Record a change for this operation.
    pub fn record_change(&mut self, kind: EntityKind, entity_id: &str, change_type: ChangeType) {
        self.changes
            .push(ChangeEvent::new(kind, entity_id, change_type, &self.op_name));
    }
}

/// One recorded sync pass for one entity kind.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncRun {
    pub id: i64,
    pub entity_kind: String,
    pub status: String,
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
    pub io_errors: usize,
    pub error: Option<String>,
    /// Whether the pass was requested by the user rather than the schedule.
    pub manual: bool,
    /// Unix milliseconds.
    pub finished_at: i64,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist. File
    /// databases run in WAL mode so a `watch` loop and a manual `sync` can
    /// read while the other writes; a writer waits up to [`BUSY_TIMEOUT`]
    /// for the other's lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::trace!(path = %path.display(), journal_mode = %mode, "Opened database");

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes the change-log rows the closure recorded, trimming each
    ///    touched kind to [`CHANGE_LOG_RETENTION`] rows
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op);

        let result = f(&tx, &mut ctx)?;

        for change in &ctx.changes {
            insert_change(&tx, change)?;
        }

        let mut kinds: Vec<&str> = ctx.changes.iter().map(|c| c.entity_kind.as_str()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        for kind in kinds {
            prune_changes(&tx, kind, CHANGE_LOG_RETENTION)?;
        }

        tx.commit()?;

        Ok(result)
    }

    // ==================
    // Sync Operations
    // ==================

    /// Read every stored entity of one kind, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `CorruptRecord` if a row cannot be decoded, or a database error.
    pub fn read_all<E: StoredEntity>(&self) -> Result<Vec<E>> {
        let sql = format!("SELECT {} FROM {} ORDER BY rowid", E::COLUMNS, E::TABLE);
        query_entities(&self.conn, &sql, [])
    }

    /// Apply one kind's batch atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if any operation fails; nothing is written in that case.
    pub fn apply_batch<E: StoredEntity>(&mut self, ops: &[Operation<E>]) -> Result<()> {
        let op_name = format!("sync_{}", E::KIND);
        self.mutate(&op_name, |tx, ctx| apply_ops(tx, ctx, ops))
    }

    /// Apply both kinds' batches in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any operation fails; neither batch is written in that case.
    pub fn apply_combined(
        &mut self,
        projects: &[Operation<Project>],
        events: &[Operation<Event>],
    ) -> Result<()> {
        self.mutate("sync_all", |tx, ctx| {
            apply_ops(tx, ctx, projects)?;
            apply_ops(tx, ctx, events)
        })
    }

    // ==================
    // Catalogue Queries
    // ==================

    /// List projects, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_projects(&self, category: Option<ProjectCategory>) -> Result<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects
             WHERE ?1 IS NULL OR category = ?1
             ORDER BY name COLLATE NOCASE, id",
            Project::COLUMNS
        );
        query_entities(&self.conn, &sql, [category.map(|c| c.code())])
    }

    /// Get a project by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        get_by_id(&self.conn, id)
    }

    /// List events ordered by start time.
    ///
    /// With `upcoming_after`, events that finished before that instant are
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_events(&self, upcoming_after: Option<DateTime<FixedOffset>>) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self.read_all()?;
        if let Some(now) = upcoming_after {
            events.retain(|e| e.is_upcoming(now));
        }
        // Undated events sort last
        events.sort_by(|a, b| match (a.starts_at, b.starts_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        Ok(events)
    }

    /// Get an event by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_event(&self, id: &str) -> Result<Option<Event>> {
        get_by_id(&self.conn, id)
    }

    /// Number of stored rows of one kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        let table = match kind {
            EntityKind::Projects => Project::TABLE,
            EntityKind::Events => Event::TABLE,
        };
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Most recent change-log rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_changes(
        &self,
        kind: Option<EntityKind>,
        limit: Option<u32>,
    ) -> Result<Vec<ChangeEvent>> {
        Ok(recent_changes(&self.conn, kind, limit)?)
    }

    // ==================
    // Sync Log
    // ==================

    /// Record the outcome of one pass.
    ///
    /// Keeps the newest [`SYNC_RUN_RETENTION`] rows of the run's kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or the trim fails.
    pub fn record_sync_run(&mut self, run: &SyncRun) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sync_runs
               (entity_kind, status, inserts, updates, deletes, io_errors, error, manual, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                run.entity_kind,
                run.status,
                run.inserts,
                run.updates,
                run.deletes,
                run.io_errors,
                run.error,
                run.manual,
                run.finished_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        self.conn.execute(
            "DELETE FROM sync_runs
             WHERE entity_kind = ?1
               AND id NOT IN (
                   SELECT id FROM sync_runs WHERE entity_kind = ?1 ORDER BY id DESC LIMIT ?2
               )",
            rusqlite::params![run.entity_kind, SYNC_RUN_RETENTION],
        )?;
        Ok(id)
    }

    /// Most recent passes, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn last_sync_runs(&self, limit: u32) -> Result<Vec<SyncRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_kind, status, inserts, updates, deletes, io_errors, error, manual, finished_at
             FROM sync_runs
             ORDER BY finished_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit], map_sync_run)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// The newest recorded pass for one kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn last_sync_run(&self, kind: EntityKind) -> Result<Option<SyncRun>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, entity_kind, status, inserts, updates, deletes, io_errors, error, manual, finished_at
                 FROM sync_runs
                 WHERE entity_kind = ?1
                 ORDER BY finished_at DESC, id DESC
                 LIMIT 1",
                [kind.as_str()],
                map_sync_run,
            )
            .optional()?)
    }
}

fn apply_ops<E: StoredEntity>(
    tx: &Transaction,
    ctx: &mut MutationContext,
    ops: &[Operation<E>],
) -> Result<()> {
    let delete_sql = format!("DELETE FROM {} WHERE id = ?1", E::TABLE);

    for op in ops {
        match op {
            Operation::Insert(entity) => {
                entity.upsert(tx)?;
                ctx.record_change(E::KIND, entity.id(), ChangeType::Inserted);
            }
            Operation::Update { id, entity } => {
                // Row removed by an overlapping pass since it was read
                if entity.update(tx, id)? == 0 {
                    tracing::debug!(kind = %E::KIND, id = %id, "Update target missing, inserting");
                    entity.upsert(tx)?;
                }
                ctx.record_change(E::KIND, id, ChangeType::Updated);
            }
            Operation::Delete { id } => {
                tx.execute(&delete_sql, [id])?;
                ctx.record_change(E::KIND, id, ChangeType::Deleted);
            }
        }
    }

    Ok(())
}

fn query_entities<E: StoredEntity, P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<E>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(E::from_row(row)?);
    }
    Ok(out)
}

fn get_by_id<E: StoredEntity>(conn: &Connection, id: &str) -> Result<Option<E>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", E::COLUMNS, E::TABLE);
    Ok(query_entities(conn, &sql, [id])?.into_iter().next())
}

fn map_sync_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncRun> {
    Ok(SyncRun {
        id: row.get(0)?,
        entity_kind: row.get(1)?,
        status: row.get(2)?,
        inserts: row.get(3)?,
        updates: row.get(4)?,
        deletes: row.get(5)?,
        io_errors: row.get(6)?,
        error: row.get(7)?,
        manual: row.get(8)?,
        finished_at: row.get(9)?,
    })
}
