/// Project, project status and label models
///
/// Projects belong to a team and have one owner. Each project defines its own
/// ordered set of statuses; the `Backlog / In Progress / Done` triad is seeded at
/// creation but is only a convention. Statuses may carry a work-in-progress limit
/// which is stored and returned but never enforced.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY,
///     team_id UUID NOT NULL REFERENCES teams(id),
///     owner_id UUID NOT NULL REFERENCES users(id),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     is_archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
///
/// CREATE TABLE project_statuses (
///     id UUID PRIMARY KEY,
///     project_id UUID NOT NULL REFERENCES projects(id),
///     name VARCHAR(30) NOT NULL,
///     color VARCHAR(7),
///     position INTEGER NOT NULL DEFAULT 0,
///     wip_limit INTEGER
/// );
///
/// CREATE TABLE issue_labels (
///     id UUID PRIMARY KEY,
///     project_id UUID NOT NULL REFERENCES projects(id),
///     name VARCHAR(30) NOT NULL,
///     color VARCHAR(7) NOT NULL
/// );
///
/// CREATE TABLE project_favorites (
///     user_id UUID NOT NULL REFERENCES users(id),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (user_id, project_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::Lifecycle;

/// Statuses seeded into every new project, in column order
pub const DEFAULT_STATUSES: [&str; 3] = ["Backlog", "In Progress", "Done"];

/// Project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub team_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

/// Input for creating or editing a project
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl Project {
    pub fn new(team_id: Uuid, owner_id: Uuid, input: ProjectInput) -> Self {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            team_id,
            owner_id,
            name: input.name,
            description: input.description,
            is_archived: false,
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
        }
    }
}

/// One column of a project's board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectStatus {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub position: i32,
    /// Work-in-progress cap. Informational only.
    pub wip_limit: Option<i32>,
}

/// Input for adding a custom status column
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StatusInput {
    #[validate(length(min = 1, max = 30))]
    pub name: String,

    #[validate(length(min = 4, max = 7))]
    pub color: Option<String>,

    #[validate(range(min = 1))]
    pub wip_limit: Option<i32>,
}

impl ProjectStatus {
    /// Builds the default columns for a freshly created project
    pub fn defaults_for(project_id: Uuid) -> Vec<ProjectStatus> {
        DEFAULT_STATUSES
            .iter()
            .enumerate()
            .map(|(position, name)| ProjectStatus {
                id: Uuid::new_v4(),
                project_id,
                name: (*name).to_string(),
                color: None,
                position: position as i32,
                wip_limit: None,
            })
            .collect()
    }
}

/// Label applicable to issues of one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IssueLabel {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub color: String,
}

/// Input for creating a label
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LabelInput {
    #[validate(length(min = 1, max = 30))]
    pub name: String,

    #[validate(length(min = 4, max = 7))]
    pub color: String,
}

/// A user's bookmark on a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectFavorite {
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ProjectFavorite {
    pub fn new(user_id: Uuid, project_id: Uuid) -> Self {
        ProjectFavorite {
            user_id,
            project_id,
            created_at: Utc::now(),
        }
    }
}

/// Project as seen by one caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,

    /// Active issues in the project
    pub issue_count: i64,

    /// Whether the caller has favorited the project
    pub is_favorited: bool,
}
