//! Project model.
//!
//! Projects are the student engineering projects the department offers,
//! grouped by engineering category.

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};

/// Engineering category a project belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectCategory {
    Software,
    Power,
    Telecom,
    ElectronicsControl,
}

impl ProjectCategory {
    /// All categories in storage-code order.
    pub const ALL: [Self; 4] = [
        Self::Software,
        Self::Power,
        Self::Telecom,
        Self::ElectronicsControl,
    ];

    /// Integer code written to the `category` column.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Software => 0,
            Self::Power => 1,
            Self::Telecom => 2,
            Self::ElectronicsControl => 3,
        }
    }

    /// Inverse of [`code`](Self::code). `None` for codes this crate never writes.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Software),
            1 => Some(Self::Power),
            2 => Some(Self::Telecom),
            3 => Some(Self::ElectronicsControl),
            _ => None,
        }
    }

    /// Name used by the backend JSON.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::Power => "power",
            Self::Telecom => "telecom",
            Self::ElectronicsControl => "electronics & control",
        }
    }

    /// Parse a backend category name.
    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.wire_name() == name)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Software => "Software",
            Self::Power => "Power",
            Self::Telecom => "Telecom",
            Self::ElectronicsControl => "Electronics & Control",
        }
    }
}

impl std::fmt::Display for ProjectCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A student engineering project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Backend-assigned identifier
    pub id: String,

    /// Project title
    pub name: String,

    /// Supervising staff member
    pub head: Option<String>,

    /// Free-form description
    pub description: Option<String>,

    pub category: ProjectCategory,

    /// Courses or skills expected from applicants, in backend order
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl Project {
    /// Create a project with only the required fields set.
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: ProjectCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            head: None,
            description: None,
            category,
            prerequisites: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_head(mut self, head: impl Into<String>) -> Self {
        self.head = Some(head.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Projects;

    fn id(&self) -> &str {
        &self.id
    }
}
