//! Sync types: operations, statistics and pass outcomes.
//!
//! Everything here is transient. It is rebuilt on every pass and only the
//! per-kind summary reaches storage, as a [`SyncRun`] row.

use serde::Serialize;

use crate::model::{Entity, EntityKind};
use crate::storage::SyncRun;

/// One step of a batch, scoped to a single entity kind by `E`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation<E> {
    /// Add a remote entity that has no local row.
    Insert(E),
    /// Overwrite the local row `id` with the remote value.
    Update { id: String, entity: E },
    /// Remove the local row `id`, absent from the remote collection.
    Delete { id: String },
}

impl<E: Entity> Operation<E> {
    /// Identity the operation targets.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Insert(entity) => entity.id(),
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }
}

/// Operation counts for one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Number of inserts.
    pub inserts: usize,
    /// Number of updates.
    pub updates: usize,
    /// Number of deletes.
    pub deletes: usize,
}

impl SyncStats {
    /// Count the operations of a batch.
    #[must_use]
    pub fn tally<E>(ops: &[Operation<E>]) -> Self {
        ops.iter().fold(Self::default(), |mut stats, op| {
            match op {
                Operation::Insert(_) => stats.inserts += 1,
                Operation::Update { .. } => stats.updates += 1,
                Operation::Delete { .. } => stats.deletes += 1,
            }
            stats
        })
    }

    /// Total number of operations.
    #[must_use]
    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }

    /// Returns true if the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::ops::AddAssign for SyncStats {
    fn add_assign(&mut self, other: Self) {
        self.inserts += other.inserts;
        self.updates += other.updates;
        self.deletes += other.deletes;
    }
}

/// How one kind's pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    /// A non-empty batch was applied.
    Synced,
    /// Local already matched remote.
    UpToDate,
    /// The fetch timed out; a full resync should be scheduled.
    RetryLater,
    /// The fetch failed otherwise; local data may be stale.
    Stale,
    /// The store rejected the batch; nothing was written.
    ApplyFailed,
}

impl PassStatus {
    /// Storage/display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::UpToDate => "up_to_date",
            Self::RetryLater => "retry_later",
            Self::Stale => "stale",
            Self::ApplyFailed => "apply_failed",
        }
    }

    /// Whether the store ended the pass mirroring the backend.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Synced | Self::UpToDate)
    }
}

impl std::fmt::Display for PassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one pass for one kind.
#[derive(Debug, Clone, Serialize)]
pub struct KindOutcome {
    pub kind: EntityKind,
    pub status: PassStatus,
    /// Counts of the planned batch. Only applied when `status` is `Synced`.
    pub stats: SyncStats,
    pub io_errors: usize,
    /// Failure message for the non-success statuses.
    pub error: Option<String>,
}

impl KindOutcome {
    /// Outcome for a batch that was planned; `status` says whether it landed.
    #[must_use]
    pub fn planned(kind: EntityKind, stats: SyncStats) -> Self {
        let status = if stats.is_empty() {
            PassStatus::UpToDate
        } else {
            PassStatus::Synced
        };
        Self {
            kind,
            status,
            stats,
            io_errors: 0,
            error: None,
        }
    }

    /// Outcome for a fetch that failed before anything was planned.
    #[must_use]
    pub fn fetch_failed(kind: EntityKind, err: &FetchError) -> Self {
        let status = match err {
            FetchError::Timeout(_) => PassStatus::RetryLater,
            FetchError::Io(_) | FetchError::Malformed(_) => PassStatus::Stale,
        };
        Self {
            kind,
            status,
            stats: SyncStats::default(),
            io_errors: 1,
            error: Some(err.to_string()),
        }
    }

    /// Mark the planned batch as rejected by the store.
    #[must_use]
    pub fn apply_failed(mut self, message: String) -> Self {
        self.status = PassStatus::ApplyFailed;
        self.error = Some(message);
        self
    }

    /// Convert to a sync log row.
    #[must_use]
    pub fn to_run(&self, manual: bool, finished_at: i64) -> SyncRun {
        SyncRun {
            id: 0,
            entity_kind: self.kind.as_str().to_string(),
            status: self.status.as_str().to_string(),
            inserts: self.stats.inserts,
            updates: self.stats.updates,
            deletes: self.stats.deletes,
            io_errors: self.io_errors,
            error: self.error.clone(),
            manual,
            finished_at,
        }
    }
}

/// What asked for a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncRequest {
    /// Requested by the user rather than the schedule.
    pub manual: bool,
    /// Should run ahead of other queued background work.
    pub expedited: bool,
}

impl SyncRequest {
    /// A scheduled pass.
    #[must_use]
    pub const fn periodic() -> Self {
        Self {
            manual: false,
            expedited: false,
        }
    }

    /// A user-triggered "sync now".
    #[must_use]
    pub const fn manual() -> Self {
        Self {
            manual: true,
            expedited: true,
        }
    }
}

/// Aggregated outcome of a sync run across all kinds.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    /// Operations applied, across kinds.
    pub entries_total: usize,
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
    pub io_error_count: usize,
    /// A fetch timed out; the scheduler should retry with a full pass.
    pub full_resync_requested: bool,
    /// A fetch or apply failed; local data may be stale.
    pub storage_error_occurred: bool,
    pub trigger: SyncRequest,
    pub kinds: Vec<KindOutcome>,
}

impl SyncOutcome {
    /// Aggregate per-kind outcomes.
    ///
    /// Counts include only batches that were applied.
    #[must_use]
    pub fn from_kinds(trigger: SyncRequest, kinds: Vec<KindOutcome>) -> Self {
        let mut applied = SyncStats::default();
        let mut io_error_count = 0;
        let mut full_resync_requested = false;
        let mut storage_error_occurred = false;

        for outcome in &kinds {
            io_error_count += outcome.io_errors;
            match outcome.status {
                PassStatus::Synced => applied += outcome.stats,
                PassStatus::UpToDate => {}
                PassStatus::RetryLater => full_resync_requested = true,
                PassStatus::Stale | PassStatus::ApplyFailed => storage_error_occurred = true,
            }
        }

        Self {
            entries_total: applied.total(),
            inserts: applied.inserts,
            updates: applied.updates,
            deletes: applied.deletes,
            io_error_count,
            full_resync_requested,
            storage_error_occurred,
            trigger,
            kinds,
        }
    }

    /// Outcome for one kind, if it took part in the run.
    #[must_use]
    pub fn kind(&self, kind: EntityKind) -> Option<&KindOutcome> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    /// Whether every kind ended up mirroring the backend.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.kinds.iter().all(|k| k.status.is_success())
    }
}

/// Remote fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete in time.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection, HTTP status or body transfer failure.
    #[error("Fetch failed: {0}")]
    Io(String),

    /// The payload was not a valid collection.
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Io(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, ProjectCategory};

    fn p(id: &str) -> Project {
        Project::new(id, id, ProjectCategory::Power)
    }

    #[test]
    fn test_stats_tally() {
        let ops = vec![
            Operation::Update {
                id: "a".into(),
                entity: p("a"),
            },
            Operation::Delete { id: "b".into() },
            Operation::Insert(p("c")),
            Operation::Insert(p("d")),
        ];
        let stats = SyncStats::tally(&ops);
        assert_eq!(
            stats,
            SyncStats {
                inserts: 2,
                updates: 1,
                deletes: 1
            }
        );
        assert_eq!(stats.total(), 4);
        assert_eq!(ops[1].id(), "b");
    }

    #[test]
    fn test_outcome_aggregation() {
        let synced = KindOutcome::planned(
            EntityKind::Projects,
            SyncStats {
                inserts: 3,
                updates: 1,
                deletes: 0,
            },
        );
        let timed_out =
            KindOutcome::fetch_failed(EntityKind::Events, &FetchError::Timeout("events".into()));

        let outcome = SyncOutcome::from_kinds(SyncRequest::manual(), vec![synced, timed_out]);

        assert_eq!(outcome.entries_total, 4);
        assert_eq!(outcome.io_error_count, 1);
        assert!(outcome.full_resync_requested);
        assert!(!outcome.storage_error_occurred);
        assert!(!outcome.is_success());
        assert_eq!(
            outcome.kind(EntityKind::Events).unwrap().status,
            PassStatus::RetryLater
        );
    }

    #[test]
    fn test_failed_apply_not_counted() {
        let failed = KindOutcome::planned(
            EntityKind::Projects,
            SyncStats {
                inserts: 2,
                updates: 0,
                deletes: 0,
            },
        )
        .apply_failed("disk full".into());

        let outcome = SyncOutcome::from_kinds(SyncRequest::periodic(), vec![failed]);
        assert_eq!(outcome.entries_total, 0);
        assert!(outcome.storage_error_occurred);
        assert!(!outcome.trigger.manual);
    }

    #[test]
    fn test_malformed_is_stale() {
        let outcome =
            KindOutcome::fetch_failed(EntityKind::Projects, &FetchError::Malformed("bad".into()));
        assert_eq!(outcome.status, PassStatus::Stale);
        assert_eq!(outcome.io_errors, 1);

        let run = outcome.to_run(false, 42);
        assert_eq!(run.status, "stale");
        assert_eq!(run.entity_kind, "projects");
    }
}
