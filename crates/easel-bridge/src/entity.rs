//! Entity identity and persistence records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of artifact the workbench persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Diagram document
    Diagram,
    /// Requirement document
    Requirement,
    /// Free-form note
    Note,
}

impl ArtifactKind {
    /// Lowercase label used in notices and logs.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diagram => "diagram",
            Self::Requirement => "requirement",
            Self::Note => "note",
        }
    }
}

/// Stable reference to a persistable entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Stable identifier
    pub id: Uuid,
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Human-readable label for notices
    pub label: String,
}

impl EntityRef {
    /// Create a reference with a fresh id.
    #[inline]
    #[must_use]
    pub fn new(kind: ArtifactKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            label: label.into(),
        }
    }

    /// With a specific id.
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} \"{}\"", self.kind.as_str(), self.label)
    }
}

/// Receipt returned by a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRecord {
    /// Entity the content was stored under
    pub id: Uuid,
    /// Monotonic revision assigned by the store
    pub revision: u64,
    /// Completion time reported by the store
    pub saved_at: DateTime<Utc>,
}

/// Whether an entity already exists in the backing store.
///
/// Drives notification policy: existing entities announce background saves,
/// drafts stay quiet until first explicitly saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Provenance {
    /// Persisted before this editing session
    #[default]
    Existing,
    /// Never persisted yet
    Draft,
}

impl Provenance {
    /// Whether background saves of this entity should be announced.
    #[inline]
    #[must_use]
    pub fn announces_saves(self) -> bool {
        matches!(self, Self::Existing)
    }
}
