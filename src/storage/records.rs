//! Row codecs for the catalogue tables.
//!
//! [`StoredEntity`] maps an entity onto its table. Encoding is total;
//! decoding fails with [`Error::CorruptRecord`] for values the encoder
//! never produces (unknown category codes, malformed JSON or timestamps).

use chrono::{DateTime, FixedOffset};
use rusqlite::{Connection, Row};

use crate::error::{Error, Result};
use crate::model::{Entity, Event, GeoPoint, Project, ProjectCategory};

/// An entity with a table in the local store.
pub trait StoredEntity: Entity {
    /// Table holding this kind.
    const TABLE: &'static str;

    /// Column list for `SELECT`, in the order [`from_row`](Self::from_row) reads.
    const COLUMNS: &'static str;

    /// Decode one row selected with [`COLUMNS`](Self::COLUMNS).
    ///
    /// # Errors
    ///
    /// Returns `CorruptRecord` for values this crate never writes.
    fn from_row(row: &Row<'_>) -> Result<Self>;

    /// Insert, or overwrite the row with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    fn upsert(&self, conn: &Connection) -> Result<usize>;

    /// Overwrite every column of row `id` with this entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    fn update(&self, conn: &Connection, id: &str) -> Result<usize>;
}

fn corrupt<E: Entity>(id: &str, reason: impl Into<String>) -> Error {
    Error::CorruptRecord {
        kind: E::KIND,
        id: id.to_string(),
        reason: reason.into(),
    }
}

// ── Projects ─────────────────────────────────────────────────

fn encode_prerequisites(prerequisites: &[String]) -> Result<String> {
    Ok(serde_json::to_string(prerequisites)?)
}

impl StoredEntity for Project {
    const TABLE: &'static str = "projects";
    const COLUMNS: &'static str = "id, name, head, description, category, prerequisites";

    fn from_row(row: &Row<'_>) -> Result<Self> {
        let id: String = row.get(0)?;

        let code: i64 = row.get(4)?;
        let category = ProjectCategory::from_code(code)
            .ok_or_else(|| corrupt::<Self>(&id, format!("unknown category code {code}")))?;

        let raw: String = row.get(5)?;
        let prerequisites: Vec<String> = serde_json::from_str(&raw)
            .map_err(|e| corrupt::<Self>(&id, format!("prerequisites are not a JSON list: {e}")))?;

        Ok(Self {
            name: row.get(1)?,
            head: row.get(2)?,
            description: row.get(3)?,
            category,
            prerequisites,
            id,
        })
    }

    fn upsert(&self, conn: &Connection) -> Result<usize> {
        let changed = conn.execute(
            "INSERT INTO projects (id, name, head, description, category, prerequisites)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               head = excluded.head,
               description = excluded.description,
               category = excluded.category,
               prerequisites = excluded.prerequisites",
            rusqlite::params![
                self.id,
                self.name,
                self.head,
                self.description,
                self.category.code(),
                encode_prerequisites(&self.prerequisites)?,
            ],
        )?;
        Ok(changed)
    }

    fn update(&self, conn: &Connection, id: &str) -> Result<usize> {
        let changed = conn.execute(
            "UPDATE projects
             SET name = ?2, head = ?3, description = ?4, category = ?5, prerequisites = ?6
             WHERE id = ?1",
            rusqlite::params![
                id,
                self.name,
                self.head,
                self.description,
                self.category.code(),
                encode_prerequisites(&self.prerequisites)?,
            ],
        )?;
        Ok(changed)
    }
}

// ── Events ───────────────────────────────────────────────────

fn encode_time(time: Option<&DateTime<FixedOffset>>) -> Option<String> {
    time.map(DateTime::to_rfc3339)
}

fn decode_time(id: &str, column: &str, raw: Option<String>) -> Result<Option<DateTime<FixedOffset>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map_err(|e| corrupt::<Event>(id, format!("{column} '{s}' is not RFC 3339: {e}")))
    })
    .transpose()
}

impl StoredEntity for Event {
    const TABLE: &'static str = "events";
    const COLUMNS: &'static str =
        "id, name, description, image_uri, longitude, latitude, starts_at, ends_at";

    fn from_row(row: &Row<'_>) -> Result<Self> {
        let id: String = row.get(0)?;

        let longitude: Option<String> = row.get(4)?;
        let latitude: Option<String> = row.get(5)?;
        let location = match (longitude, latitude) {
            (Some(longitude), Some(latitude)) => Some(GeoPoint { longitude, latitude }),
            (None, None) => None,
            _ => return Err(corrupt::<Self>(&id, "location has only one coordinate")),
        };

        let starts_at = decode_time(&id, "starts_at", row.get(6)?)?;
        let ends_at = decode_time(&id, "ends_at", row.get(7)?)?;

        Ok(Self {
            name: row.get(1)?,
            description: row.get(2)?,
            image_uri: row.get(3)?,
            location,
            starts_at,
            ends_at,
            id,
        })
    }

    fn upsert(&self, conn: &Connection) -> Result<usize> {
        let changed = conn.execute(
            "INSERT INTO events (id, name, description, image_uri, longitude, latitude, starts_at, ends_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               description = excluded.description,
               image_uri = excluded.image_uri,
               longitude = excluded.longitude,
               latitude = excluded.latitude,
               starts_at = excluded.starts_at,
               ends_at = excluded.ends_at",
            rusqlite::params![
                self.id,
                self.name,
                self.description,
                self.image_uri,
                self.location.as_ref().map(|l| l.longitude.as_str()),
                self.location.as_ref().map(|l| l.latitude.as_str()),
                encode_time(self.starts_at.as_ref()),
                encode_time(self.ends_at.as_ref()),
            ],
        )?;
        Ok(changed)
    }

    fn update(&self, conn: &Connection, id: &str) -> Result<usize> {
        let changed = conn.execute(
            "UPDATE events
             SET name = ?2, description = ?3, image_uri = ?4, longitude = ?5,
                 latitude = ?6, starts_at = ?7, ends_at = ?8
             WHERE id = ?1",
            rusqlite::params![
                id,
                self.name,
                self.description,
                self.image_uri,
                self.location.as_ref().map(|l| l.longitude.as_str()),
                self.location.as_ref().map(|l| l.latitude.as_str()),
                encode_time(self.starts_at.as_ref()),
                encode_time(self.ends_at.as_ref()),
            ],
        )?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    fn read_one<E: StoredEntity>(conn: &Connection) -> Result<E> {
        let sql = format!("SELECT {} FROM {}", E::COLUMNS, E::TABLE);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let row = rows.next()?.expect("one row");
        E::from_row(row)
    }

    #[test]
    fn test_project_round_trip_keeps_empty_prerequisites() {
        let conn = conn();
        let project = Project::new("p1", "Solar Tracker", ProjectCategory::Power);
        project.upsert(&conn).unwrap();

        let read: Project = read_one(&conn).unwrap();
        assert_eq!(read, project);
        assert!(read.prerequisites.is_empty());
    }

    #[test]
    fn test_event_round_trip_keeps_offsets() {
        let conn = conn();
        let event = Event::new("e1", "Graduation Expo")
            .with_location(GeoPoint::new("32.5336", "15.6031"))
            .with_schedule(
                Some(DateTime::parse_from_rfc3339("2024-05-02T09:30:00+02:00").unwrap()),
                Some(DateTime::parse_from_rfc3339("2024-05-02T16:00:00.250+02:00").unwrap()),
            );
        event.upsert(&conn).unwrap();

        let read: Event = read_one(&conn).unwrap();
        assert_eq!(read, event);
        assert_eq!(read.starts_at.unwrap().offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_unknown_category_code_is_corrupt() {
        let conn = conn();
        conn.execute(
            "INSERT INTO projects (id, name, category, prerequisites) VALUES ('p9', 'Odd', 42, '[]')",
            [],
        )
        .unwrap();

        let err = read_one::<Project>(&conn).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { ref id, .. } if id == "p9"));
    }

    #[test]
    fn test_half_location_is_corrupt() {
        let conn = conn();
        conn.execute(
            "INSERT INTO events (id, name, longitude) VALUES ('e9', 'Half', '32.5')",
            [],
        )
        .unwrap();

        assert!(matches!(
            read_one::<Event>(&conn),
            Err(Error::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_update_reports_missing_rows() {
        let conn = conn();
        let project = Project::new("p1", "Ghost", ProjectCategory::Software);
        assert_eq!(project.update(&conn, "p1").unwrap(), 0);

        project.upsert(&conn).unwrap();
        let renamed = Project::new("p1", "Renamed", ProjectCategory::Software);
        assert_eq!(renamed.update(&conn, "p1").unwrap(), 1);
    }
}
