/// Issue, subtask and issue read-model types
///
/// An issue lives in one project, has a creator, an optional assignee, a
/// project-defined status, a closed-set priority, a board position and optional
/// AI cache fields.
///
/// # Invariants
///
/// - `position` orders issues within `(project, status)`; it is caller-supplied and
///   neither unique nor reindexed.
/// - Any description edit clears `ai.summary`, `ai.suggestion` and `ai.cached_at`
///   together, even when the new text equals the old one (see [`Issue::set_description`]).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE issue_priority AS ENUM ('LOW', 'MEDIUM', 'HIGH');
///
/// CREATE TABLE issues (
///     id UUID PRIMARY KEY,
///     project_id UUID NOT NULL REFERENCES projects(id),
///     creator_id UUID NOT NULL REFERENCES users(id),
///     assignee_id UUID REFERENCES users(id),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     status VARCHAR(30) NOT NULL,
///     priority issue_priority NOT NULL DEFAULT 'MEDIUM',
///     position INTEGER NOT NULL DEFAULT 0,
///     due_date DATE,
///     ai_summary TEXT,
///     ai_suggestion TEXT,
///     ai_summary_cached_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::Lifecycle;
use super::project::IssueLabel;

/// Issue priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "issue_priority", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum IssuePriority {
    Low,
    #[default]
    Medium,
    High,
}

impl IssuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuePriority::Low => "LOW",
            IssuePriority::Medium => "MEDIUM",
            IssuePriority::High => "HIGH",
        }
    }
}

impl fmt::Display for IssuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssuePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(IssuePriority::Low),
            "MEDIUM" => Ok(IssuePriority::Medium),
            "HIGH" => Ok(IssuePriority::High),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// Cached AI output stored on the issue
///
/// `cached_at` is written only when a summary is stored; suggestions reuse it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiCacheFields {
    pub summary: Option<String>,
    pub suggestion: Option<String>,
    pub cached_at: Option<DateTime<Utc>>,
}

impl AiCacheFields {
    pub fn clear(&mut self) {
        self.summary = None;
        self.suggestion = None;
        self.cached_at = None;
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.suggestion.is_none() && self.cached_at.is_none()
    }
}

/// Issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: IssuePriority,
    pub position: i32,
    pub due_date: Option<NaiveDate>,
    pub ai: AiCacheFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

impl Issue {
    /// Builds a new issue in `status` created by `creator_id`
    pub fn new(project_id: Uuid, creator_id: Uuid, status: String, input: &CreateIssue) -> Self {
        let now = Utc::now();
        Issue {
            id: Uuid::new_v4(),
            project_id,
            creator_id,
            assignee_id: input.assignee_id,
            title: input.title.clone(),
            description: input.description.clone(),
            status,
            priority: input.priority,
            position: 0,
            due_date: input.due_date,
            ai: AiCacheFields::default(),
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
        }
    }

    /// Replaces the description and invalidates every cached AI output
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.ai.clear();
    }

    /// Description length in characters (0 when absent)
    pub fn description_chars(&self) -> usize {
        self.description
            .as_deref()
            .map(|d| d.chars().count())
            .unwrap_or(0)
    }
}

/// Input for creating an issue
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateIssue {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub assignee_id: Option<Uuid>,

    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub priority: IssuePriority,

    /// Labels to attach (at most five)
    #[serde(default)]
    pub label_ids: Vec<Uuid>,
}

/// Partial issue update. `None` leaves a field untouched.
///
/// `assignee` and `due_date` are doubly optional: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateIssue {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub assignee: Option<Option<Uuid>>,

    pub status: Option<String>,

    pub priority: Option<IssuePriority>,

    pub due_date: Option<Option<NaiveDate>>,
}

/// Board drag-and-drop: new status and optional position
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StatusUpdate {
    #[validate(length(min = 1, max = 30))]
    pub status: String,

    pub position: Option<i32>,
}

/// Filters for listing issues in a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFilter {
    pub status: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub priority: Option<IssuePriority>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &Issue) -> bool {
        self.status.as_ref().map_or(true, |s| &issue.status == s)
            && self.assignee_id.map_or(true, |a| issue.assignee_id == Some(a))
            && self.priority.map_or(true, |p| issue.priority == p)
    }
}

/// Checklist entry of an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subtask {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub title: String,
    pub is_completed: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a subtask
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubtaskInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

/// Materialized issue read model: the issue joined with its labels, subtasks
/// and the display names of its assignee and creator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueView {
    #[serde(flatten)]
    pub issue: Issue,
    pub labels: Vec<IssueLabel>,
    pub subtasks: Vec<Subtask>,
    pub assignee_name: Option<String>,
    pub creator_name: Option<String>,
}
