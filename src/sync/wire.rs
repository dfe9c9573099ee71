//! Backend JSON records and their conversion to entities.
//!
//! The backend serves each collection as a JSON array. Field names follow
//! the backend (`desc`, `imageUri`, `start`, ...), not the entity structs.

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::types::FetchError;
use crate::model::{Entity, Event, GeoPoint, Project, ProjectCategory};

/// An entity the backend publishes.
pub trait RemoteEntity: Entity {
    /// JSON shape of one array element.
    type Wire: DeserializeOwned;

    /// Path segment below the backend base URL.
    const ENDPOINT: &'static str;

    /// Convert one decoded element.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Malformed` for values outside the entity's domain.
    fn from_wire(wire: Self::Wire) -> Result<Self, FetchError>;
}

/// Decode a whole collection payload.
///
/// One bad element rejects the payload; a partial collection would make
/// reconciliation delete the rows it left out.
///
/// # Errors
///
/// Returns `FetchError::Malformed` if the payload or any element is invalid.
pub fn decode_collection<E: RemoteEntity>(body: &[u8]) -> Result<Vec<E>, FetchError> {
    let records: Vec<E::Wire> = serde_json::from_slice(body)?;
    records.into_iter().map(E::from_wire).collect()
}

// ── Projects ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProjectWire {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default, alias = "prereq")]
    pub prerequisites: Option<Vec<String>>,
    pub category: String,
}

impl RemoteEntity for Project {
    type Wire = ProjectWire;
    const ENDPOINT: &'static str = "projects";

    fn from_wire(wire: ProjectWire) -> Result<Self, FetchError> {
        let category = ProjectCategory::from_wire_name(&wire.category).ok_or_else(|| {
            FetchError::Malformed(format!(
                "project {}: unknown category '{}'",
                wire.id, wire.category
            ))
        })?;

        Ok(Self {
            id: wire.id,
            name: wire.name,
            head: wire.head,
            description: wire.desc,
            category,
            prerequisites: wire.prerequisites.unwrap_or_default(),
        })
    }
}

// ── Events ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWire {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    /// `"longitude,latitude"`
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

fn parse_location(id: &str, raw: Option<&str>) -> Result<Option<GeoPoint>, FetchError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    match raw.split(',').map(str::trim).collect::<Vec<_>>()[..] {
        [longitude, latitude] if !longitude.is_empty() && !latitude.is_empty() => {
            Ok(Some(GeoPoint::new(longitude, latitude)))
        }
        _ => Err(FetchError::Malformed(format!(
            "event {id}: location '{raw}' is not 'longitude,latitude'"
        ))),
    }
}

fn parse_time(
    id: &str,
    field: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<FixedOffset>>, FetchError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| {
            DateTime::parse_from_rfc3339(s).map_err(|e| {
                FetchError::Malformed(format!("event {id}: {field} '{s}': {e}"))
            })
        })
        .transpose()
}

impl RemoteEntity for Event {
    type Wire = EventWire;
    const ENDPOINT: &'static str = "events";

    fn from_wire(wire: EventWire) -> Result<Self, FetchError> {
        let location = parse_location(&wire.id, wire.location.as_deref())?;
        let starts_at = parse_time(&wire.id, "start", wire.start.as_deref())?;
        let ends_at = parse_time(&wire.id, "end", wire.end.as_deref())?;

        Ok(Self {
            id: wire.id,
            name: wire.name,
            description: wire.desc,
            image_uri: wire.image_uri,
            location,
            starts_at,
            ends_at,
        })
    }
}
