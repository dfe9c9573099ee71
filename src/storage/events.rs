//! Change log storage and retrieval.
//!
//! Every operation a sync batch applies is recorded in the same
//! transaction, so the log never disagrees with the catalogue tables.

use rusqlite::types::Type;
use rusqlite::{Connection, Result};

use crate::model::EntityKind;

/// What a batch operation did to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Inserted,
    Updated,
    Deleted,
}

impl ChangeType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl std::str::FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "inserted" => Ok(Self::Inserted),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            _ => Err(format!("unknown change type '{s}'")),
        }
    }
}

/// A change log record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChangeEvent {
    pub id: i64,
    pub entity_kind: String,
    pub entity_id: String,
    pub change_type: ChangeType,
    /// Name of the mutation that produced the change.
    pub batch: String,
    pub created_at: i64,
}

impl ChangeEvent {
    /// Create a new change record (id will be assigned by database).
    #[must_use]
    pub fn new(kind: EntityKind, entity_id: &str, change_type: ChangeType, batch: &str) -> Self {
        Self {
            id: 0,
            entity_kind: kind.as_str().to_string(),
            entity_id: entity_id.to_string(),
            change_type,
            batch: batch.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Insert a change record.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_change(conn: &Connection, event: &ChangeEvent) -> Result<i64> {
    conn.execute(
        "INSERT INTO change_log (entity_kind, entity_id, change_type, batch, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            event.entity_kind,
            event.entity_id,
            event.change_type.as_str(),
            event.batch,
            event.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent changes, newest first, optionally for one kind.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn recent_changes(
    conn: &Connection,
    kind: Option<EntityKind>,
    limit: Option<u32>,
) -> Result<Vec<ChangeEvent>> {
    let limit = limit.unwrap_or(20);
    let mut stmt = conn.prepare(
        "SELECT id, entity_kind, entity_id, change_type, batch, created_at
         FROM change_log
         WHERE ?1 IS NULL OR entity_kind = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(
        rusqlite::params![kind.map(|k| k.as_str()), limit],
        |row| {
            Ok(ChangeEvent {
                id: row.get(0)?,
                entity_kind: row.get(1)?,
                entity_id: row.get(2)?,
                change_type: row.get::<_, String>(3)?.parse().map_err(|e: String| {
                    rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
                })?,
                batch: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )?;

    rows.collect()
}

/// Delete all but the newest `keep` change-log rows of one kind.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn prune_changes(conn: &Connection, entity_kind: &str, keep: u32) -> Result<usize> {
    conn.execute(
        "DELETE FROM change_log
         WHERE entity_kind = ?1
           AND id NOT IN (
               SELECT id FROM change_log WHERE entity_kind = ?1 ORDER BY id DESC LIMIT ?2
           )",
        rusqlite::params![entity_kind, keep],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn test_change_insert_and_filter() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let first = ChangeEvent::new(EntityKind::Projects, "p1", ChangeType::Inserted, "sync_projects");
        let second = ChangeEvent::new(EntityKind::Events, "e1", ChangeType::Deleted, "sync_events");
        assert!(insert_change(&conn, &first).unwrap() > 0);
        insert_change(&conn, &second).unwrap();

        let all = recent_changes(&conn, None, Some(10)).unwrap();
        assert_eq!(all.len(), 2);

        let events = recent_changes(&conn, Some(EntityKind::Events), None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entity_id, "e1");
        assert_eq!(events[0].change_type, ChangeType::Deleted);
    }

    #[test]
    fn test_unknown_change_type_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO change_log (entity_kind, entity_id, change_type, batch, created_at)
             VALUES ('projects', 'p1', 'renamed', 'sync_projects', 1)",
            [],
        )
        .unwrap();

        let err = recent_changes(&conn, None, None).unwrap_err();
        assert!(err.to_string().contains("renamed"), "got {err}");
    }

    #[test]
    fn test_prune_keeps_newest_per_kind() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        for id in ["p1", "p2", "p3", "p4"] {
            let change = ChangeEvent::new(EntityKind::Projects, id, ChangeType::Inserted, "sync_projects");
            insert_change(&conn, &change).unwrap();
        }
        let event = ChangeEvent::new(EntityKind::Events, "e1", ChangeType::Inserted, "sync_events");
        insert_change(&conn, &event).unwrap();

        assert_eq!(prune_changes(&conn, "projects", 2).unwrap(), 2);

        let projects = recent_changes(&conn, Some(EntityKind::Projects), None).unwrap();
        let ids: Vec<&str> = projects.iter().map(|c| c.entity_id.as_str()).collect();
        assert_eq!(ids, ["p4", "p3"]);
        assert_eq!(recent_changes(&conn, Some(EntityKind::Events), None).unwrap().len(), 1);
    }
}
