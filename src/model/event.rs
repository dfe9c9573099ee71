//! Event model.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};

/// A geographic position as sent by the backend.
///
/// Coordinates are kept as the backend's decimal strings so that equality
/// is exact and storage round-trips are lossless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: String,
    pub latitude: String,
}

impl GeoPoint {
    pub fn new(longitude: impl Into<String>, latitude: impl Into<String>) -> Self {
        Self {
            longitude: longitude.into(),
            latitude: latitude.into(),
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

/// A department event (talks, exhibitions, workshops).
///
/// Equality is field-exact: two timestamps for the same instant but with
/// different UTC offsets are different values.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Backend-assigned identifier
    pub id: String,

    pub name: String,

    pub description: Option<String>,

    /// Poster image reference (opaque, never fetched)
    pub image_uri: Option<String>,

    pub location: Option<GeoPoint>,

    pub starts_at: Option<DateTime<FixedOffset>>,

    pub ends_at: Option<DateTime<FixedOffset>>,
}

impl Event {
    /// Create an event with only the required fields set.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            image_uri: None,
            location: None,
            starts_at: None,
            ends_at: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_image_uri(mut self, uri: impl Into<String>) -> Self {
        self.image_uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_schedule(
        mut self,
        starts_at: Option<DateTime<FixedOffset>>,
        ends_at: Option<DateTime<FixedOffset>>,
    ) -> Self {
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        self
    }

    /// Whether the event has not finished by `now`.
    ///
    /// Events without any timestamps are treated as upcoming.
    #[must_use]
    pub fn is_upcoming(&self, now: DateTime<FixedOffset>) -> bool {
        match (self.ends_at, self.starts_at) {
            (Some(end), _) => end >= now,
            (None, Some(start)) => start >= now,
            (None, None) => true,
        }
    }
}

/// Same instant and same offset. chrono's own `==` ignores the offset.
fn same_timestamp(a: Option<DateTime<FixedOffset>>, b: Option<DateTime<FixedOffset>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b && a.offset() == b.offset(),
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.image_uri == other.image_uri
            && self.location == other.location
            && same_timestamp(self.starts_at, other.starts_at)
            && same_timestamp(self.ends_at, other.ends_at)
    }
}

impl Entity for Event {
    const KIND: EntityKind = EntityKind::Events;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_is_upcoming() {
        let now = ts("2024-03-10T12:00:00+02:00");

        let past = Event::new("e1", "Past").with_schedule(
            Some(ts("2024-03-01T09:00:00+02:00")),
            Some(ts("2024-03-01T17:00:00+02:00")),
        );
        let ongoing = Event::new("e2", "Ongoing").with_schedule(
            Some(ts("2024-03-10T09:00:00+02:00")),
            Some(ts("2024-03-10T17:00:00+02:00")),
        );
        let undated = Event::new("e3", "Undated");

        assert!(!past.is_upcoming(now));
        assert!(ongoing.is_upcoming(now));
        assert!(undated.is_upcoming(now));
    }

    #[test]
    fn test_equality_includes_offset() {
        let local = Event::new("e1", "Demo Day")
            .with_schedule(Some(ts("2024-05-02T09:30:00+02:00")), None);
        let shifted = Event::new("e1", "Demo Day")
            .with_schedule(Some(ts("2024-05-02T10:30:00+03:00")), None);

        assert_eq!(local.starts_at, shifted.starts_at, "same instant");
        assert_ne!(local, shifted);
        assert_eq!(local, local.clone());
        assert_ne!(local, Event::new("e1", "Demo Day"));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(GeoPoint::new("32.53", "15.60").to_string(), "32.53,15.60");
    }
}
