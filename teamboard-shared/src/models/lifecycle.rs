/// Soft-delete lifecycle shared by teams, projects, issues and comments
///
/// Deletion is a lifecycle transition, not removal. Every lookup in the
/// persistence layer consults [`Lifecycle::is_active`] (or the equivalent
/// `deleted_at IS NULL` filter) so deleted rows never reach a read path.
///
/// # Example
///
/// ```
/// use teamboard_shared::models::lifecycle::Lifecycle;
/// use chrono::Utc;
///
/// let mut lifecycle = Lifecycle::Active;
/// assert!(lifecycle.is_active());
///
/// lifecycle = lifecycle.delete(Utc::now());
/// assert!(!lifecycle.is_active());
/// assert!(lifecycle.deleted_at().is_some());
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle tag of a soft-deletable record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "at", rename_all = "snake_case")]
pub enum Lifecycle {
    /// Visible to every read path
    #[default]
    Active,

    /// Hidden from every read path since the given instant
    Deleted(DateTime<Utc>),
}

impl Lifecycle {
    /// Builds the tag from a nullable deletion column
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(at) => Lifecycle::Deleted(at),
            None => Lifecycle::Active,
        }
    }

    /// Returns the deletion instant, if any
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::Active => None,
            Lifecycle::Deleted(at) => Some(*at),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }

    /// Transitions to `Deleted`. Deleting twice keeps the first instant.
    pub fn delete(self, at: DateTime<Utc>) -> Self {
        match self {
            Lifecycle::Active => Lifecycle::Deleted(at),
            deleted => deleted,
        }
    }
}
