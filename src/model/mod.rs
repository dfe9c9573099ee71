//! Data models for the department catalogue.
//!
//! This module contains the two synced record types:
//! - Project
//! - Event
//!
//! Both are immutable value records compared field by field. The
//! [`Entity`] trait is what the sync engine sees of them.

pub mod event;
pub mod project;

pub use event::{Event, GeoPoint};
pub use project::{Project, ProjectCategory};

use serde::{Deserialize, Serialize};

/// The kinds of records mirrored from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Student engineering projects.
    Projects,
    /// Department events.
    Events,
}

impl EntityKind {
    /// Every kind, in the order passes are reported.
    pub const ALL: [Self; 2] = [Self::Projects, Self::Events];

    /// Storage/display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Events => "events",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projects" | "project" => Ok(Self::Projects),
            "events" | "event" => Ok(Self::Events),
            _ => Err(format!("Unknown entity kind: {s}")),
        }
    }
}

/// A record with a stable remote-assigned identity.
///
/// Equality must cover every field: reconciliation treats two entities with
/// the same id as unchanged exactly when they compare equal.
pub trait Entity: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Which collection this record belongs to.
    const KIND: EntityKind;

    /// Identity key, unique within [`Self::KIND`].
    fn id(&self) -> &str;
}
