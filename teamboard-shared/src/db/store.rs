/// Persistence collaborators
///
/// The core never talks to a database directly. Every component receives the
/// narrowest trait it needs, and [`Store`] is the umbrella implemented by both
/// [`MemoryStore`](super::memory::MemoryStore) and
/// [`PgStore`](super::postgres::PgStore).
///
/// Unless stated otherwise, every `find_*` and `list_*` method returns active
/// records only. Soft-deleted teams, projects, issues and comments are invisible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::comment::Comment;
use crate::models::history::IssueHistory;
use crate::models::issue::{Issue, IssueFilter, Subtask};
use crate::models::membership::{MemberView, Membership, TeamRole};
use crate::models::notification::Notification;
use crate::models::project::{IssueLabel, Project, ProjectFavorite, ProjectStatus};
use crate::models::team::{Team, TeamInvite};
use crate::models::user::User;

/// Lookups consulted by the authorization resolver
#[async_trait]
pub trait AccessLookup: Send + Sync {
    async fn find_team(&self, team_id: Uuid) -> StoreResult<Option<Team>>;

    /// Membership of `user_id` in an active team
    async fn find_membership(&self, team_id: Uuid, user_id: Uuid)
        -> StoreResult<Option<Membership>>;

    async fn find_project(&self, project_id: Uuid) -> StoreResult<Option<Project>>;

    async fn find_issue(&self, issue_id: Uuid) -> StoreResult<Option<Issue>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    /// Inserts the team and its owner membership as one unit
    async fn create_team(&self, team: &Team, owner: &Membership) -> StoreResult<()>;

    /// Persists name, `updated_at` and lifecycle
    async fn save_team(&self, team: &Team) -> StoreResult<()>;

    /// Active teams the user belongs to
    async fn list_teams_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Team>>;

    async fn update_member_role(&self, team_id: Uuid, user_id: Uuid, role: TeamRole)
        -> StoreResult<bool>;

    async fn delete_membership(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    /// Members joined with their profiles, oldest membership first
    async fn list_members(&self, team_id: Uuid) -> StoreResult<Vec<MemberView>>;

    async fn insert_invite(&self, invite: &TeamInvite) -> StoreResult<()>;

    async fn find_invite_by_token_hash(&self, token_hash: &str)
        -> StoreResult<Option<TeamInvite>>;

    /// Persists status and `accepted_at`
    async fn save_invite(&self, invite: &TeamInvite) -> StoreResult<()>;

    /// Marks the invite accepted and inserts the membership as one unit.
    /// Fails with `Conflict` when the membership already exists.
    async fn accept_invite(&self, invite: &TeamInvite, membership: &Membership)
        -> StoreResult<()>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Inserts the project and its initial statuses as one unit
    async fn create_project(&self, project: &Project, statuses: &[ProjectStatus])
        -> StoreResult<()>;

    async fn count_active_projects(&self, team_id: Uuid) -> StoreResult<i64>;

    async fn list_projects(&self, team_id: Uuid) -> StoreResult<Vec<Project>>;

    /// Persists name, description, archive flag, `updated_at` and lifecycle
    async fn save_project(&self, project: &Project) -> StoreResult<()>;

    async fn insert_status(&self, status: &ProjectStatus) -> StoreResult<()>;

    /// Ordered by position
    async fn list_statuses(&self, project_id: Uuid) -> StoreResult<Vec<ProjectStatus>>;

    async fn insert_label(&self, label: &IssueLabel) -> StoreResult<()>;

    async fn list_labels(&self, project_id: Uuid) -> StoreResult<Vec<IssueLabel>>;

    /// `Conflict` if the user already favorited the project
    async fn insert_favorite(&self, favorite: &ProjectFavorite) -> StoreResult<()>;

    /// Returns whether a favorite was removed
    async fn delete_favorite(&self, user_id: Uuid, project_id: Uuid) -> StoreResult<bool>;

    async fn is_favorite(&self, user_id: Uuid, project_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Inserts the issue and its label links as one unit
    async fn insert_issue(&self, issue: &Issue, label_ids: &[Uuid]) -> StoreResult<()>;

    async fn count_active_issues(&self, project_id: Uuid) -> StoreResult<i64>;

    /// Writes the full issue row and appends the history rows as one unit
    async fn apply_issue_update(&self, issue: &Issue, history: &[IssueHistory])
        -> StoreResult<()>;

    /// Newest first
    async fn list_issues(&self, project_id: Uuid, filter: &IssueFilter)
        -> StoreResult<Vec<Issue>>;

    async fn labels_for_issue(&self, issue_id: Uuid) -> StoreResult<Vec<IssueLabel>>;

    async fn count_subtasks(&self, issue_id: Uuid) -> StoreResult<i64>;

    async fn insert_subtask(&self, subtask: &Subtask) -> StoreResult<()>;

    async fn find_subtask(&self, issue_id: Uuid, subtask_id: Uuid)
        -> StoreResult<Option<Subtask>>;

    async fn save_subtask(&self, subtask: &Subtask) -> StoreResult<()>;

    /// Ordered by position
    async fn list_subtasks(&self, issue_id: Uuid) -> StoreResult<Vec<Subtask>>;

    /// Oldest first
    async fn list_history(&self, issue_id: Uuid) -> StoreResult<Vec<IssueHistory>>;

    /// Stores a summary together with its cache timestamp
    async fn store_ai_summary(&self, issue_id: Uuid, summary: &str, cached_at: DateTime<Utc>)
        -> StoreResult<()>;

    /// Stores a suggestion. The cache timestamp is left untouched.
    async fn store_ai_suggestion(&self, issue_id: Uuid, suggestion: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()>;

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>>;

    /// Persists content, `updated_at` and lifecycle
    async fn save_comment(&self, comment: &Comment) -> StoreResult<()>;

    /// Oldest first
    async fn list_comments(&self, issue_id: Uuid) -> StoreResult<Vec<Comment>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;

    /// Newest first
    async fn list_notifications(&self, user_id: Uuid, unread_only: bool)
        -> StoreResult<Vec<Notification>>;

    async fn count_unread(&self, user_id: Uuid) -> StoreResult<i64>;

    /// Returns false when the notification does not exist or belongs to someone else
    async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> StoreResult<bool>;

    /// Returns the number of notifications flipped to read
    async fn mark_all_read(&self, user_id: Uuid) -> StoreResult<u64>;
}

/// Everything the core persists
pub trait Store:
    AccessLookup + UserStore + TeamStore + ProjectStore + IssueStore + CommentStore + NotificationStore
{
}

impl<T> Store for T where
    T: AccessLookup
        + UserStore
        + TeamStore
        + ProjectStore
        + IssueStore
        + CommentStore
        + NotificationStore
{
}
