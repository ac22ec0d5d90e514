/// PostgreSQL [`Store`](super::store::Store) implementation
///
/// Soft-deletable tables carry a nullable `deleted_at` column which is mapped to
/// [`Lifecycle`] through private row types. Multi-row writes run in a
/// transaction.
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use teamboard_shared::db::postgres::PgStore;
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/teamboard")).await?;
/// let store = PgStore::new(pool);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{
    AccessLookup, CommentStore, IssueStore, NotificationStore, ProjectStore, TeamStore, UserStore,
};
use crate::error::{StoreError, StoreResult};
use crate::models::comment::Comment;
use crate::models::history::IssueHistory;
use crate::models::issue::{AiCacheFields, Issue, IssueFilter, IssuePriority, Subtask};
use crate::models::lifecycle::Lifecycle;
use crate::models::membership::{MemberView, Membership, TeamRole};
use crate::models::notification::Notification;
use crate::models::project::{IssueLabel, Project, ProjectFavorite, ProjectStatus};
use crate::models::team::{InviteStatus, Team, TeamInvite};
use crate::models::user::User;

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique violations to `Conflict`
fn conflict_on_unique(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            created_at: row.created_at,
            lifecycle: Lifecycle::from_deleted_at(row.deleted_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: Uuid,
    name: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            lifecycle: Lifecycle::from_deleted_at(row.deleted_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    team_id: Uuid,
    owner_id: Uuid,
    name: String,
    description: Option<String>,
    is_archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            team_id: row.team_id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            is_archived: row.is_archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
            lifecycle: Lifecycle::from_deleted_at(row.deleted_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct IssueRow {
    id: Uuid,
    project_id: Uuid,
    creator_id: Uuid,
    assignee_id: Option<Uuid>,
    title: String,
    description: Option<String>,
    status: String,
    priority: IssuePriority,
    position: i32,
    due_date: Option<NaiveDate>,
    ai_summary: Option<String>,
    ai_suggestion: Option<String>,
    ai_summary_cached_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<IssueRow> for Issue {
    fn from(row: IssueRow) -> Self {
        Issue {
            id: row.id,
            project_id: row.project_id,
            creator_id: row.creator_id,
            assignee_id: row.assignee_id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            position: row.position,
            due_date: row.due_date,
            ai: AiCacheFields {
                summary: row.ai_summary,
                suggestion: row.ai_suggestion,
                cached_at: row.ai_summary_cached_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
            lifecycle: Lifecycle::from_deleted_at(row.deleted_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    issue_id: Uuid,
    author_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            issue_id: row.issue_id,
            author_id: row.author_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            lifecycle: Lifecycle::from_deleted_at(row.deleted_at),
        }
    }
}

const ISSUE_COLUMNS: &str = "id, project_id, creator_id, assignee_id, title, description, status, \
     priority, position, due_date, ai_summary, ai_suggestion, ai_summary_cached_at, \
     created_at, updated_at, deleted_at";

#[async_trait]
impl AccessLookup for PgStore {
    async fn find_team(&self, team_id: Uuid) -> StoreResult<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT id, name, owner_id, created_at, updated_at, deleted_at
            FROM teams
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Team::from))
    }

    async fn find_membership(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT m.team_id, m.user_id, m.role, m.joined_at
            FROM team_members m
            JOIN teams t ON t.id = m.team_id
            WHERE m.team_id = $1 AND m.user_id = $2 AND t.deleted_at IS NULL
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn find_project(&self, project_id: Uuid) -> StoreResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, team_id, owner_id, name, description, is_archived,
                   created_at, updated_at, deleted_at
            FROM projects
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Project::from))
    }

    async fn find_issue(&self, issue_id: Uuid) -> StoreResult<Option<Issue>> {
        let sql = format!(
            "SELECT {} FROM issues WHERE id = $1 AND deleted_at IS NULL",
            ISSUE_COLUMNS
        );
        let row = sqlx::query_as::<_, IssueRow>(&sql)
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Issue::from))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, created_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.created_at)
        .bind(user.lifecycle.deleted_at())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already registered"))?;

        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, created_at, deleted_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, created_at, deleted_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl TeamStore for PgStore {
    async fn create_team(&self, team: &Team, owner: &Membership) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO teams (id, name, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(team.id)
        .bind(&team.name)
        .bind(team.owner_id)
        .bind(team.created_at)
        .bind(team.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(owner.team_id)
        .bind(owner.user_id)
        .bind(owner.role)
        .bind(owner.joined_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn save_team(&self, team: &Team) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE teams
            SET name = $2, updated_at = $3, deleted_at = $4
            WHERE id = $1
            "#,
        )
        .bind(team.id)
        .bind(&team.name)
        .bind(team.updated_at)
        .bind(team.lifecycle.deleted_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_teams_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT t.id, t.name, t.owner_id, t.created_at, t.updated_at, t.deleted_at
            FROM teams t
            JOIN team_members m ON m.team_id = t.id
            WHERE m.user_id = $1 AND t.deleted_at IS NULL
            ORDER BY t.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Team::from).collect())
    }

    async fn update_member_role(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE team_members SET role = $3 WHERE team_id = $1 AND user_id = $2",
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_membership(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_members(&self, team_id: Uuid) -> StoreResult<Vec<MemberView>> {
        let rows: Vec<(Uuid, String, String, TeamRole, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT u.id, u.name, u.email, m.role, m.joined_at
            FROM team_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.team_id = $1
            ORDER BY m.joined_at
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, name, email, role, joined_at)| MemberView {
                user_id,
                name,
                email,
                role,
                joined_at,
            })
            .collect())
    }

    async fn insert_invite(&self, invite: &TeamInvite) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO team_invites
                (id, team_id, email, status, token_hash, invited_by, created_at, expires_at, accepted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(invite.id)
        .bind(invite.team_id)
        .bind(&invite.email)
        .bind(invite.status)
        .bind(&invite.token_hash)
        .bind(invite.invited_by)
        .bind(invite.created_at)
        .bind(invite.expires_at)
        .bind(invite.accepted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "invite token already exists"))?;

        Ok(())
    }

    async fn find_invite_by_token_hash(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<TeamInvite>> {
        let invite = sqlx::query_as::<_, TeamInvite>(
            r#"
            SELECT id, team_id, email, status, token_hash, invited_by,
                   created_at, expires_at, accepted_at
            FROM team_invites
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invite)
    }

    async fn save_invite(&self, invite: &TeamInvite) -> StoreResult<()> {
        sqlx::query("UPDATE team_invites SET status = $2, accepted_at = $3 WHERE id = $1")
            .bind(invite.id)
            .bind(invite.status)
            .bind(invite.accepted_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn accept_invite(&self, invite: &TeamInvite, membership: &Membership) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(membership.team_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "user is already a team member"))?;

        sqlx::query("UPDATE team_invites SET status = $2, accepted_at = $3 WHERE id = $1")
            .bind(invite.id)
            .bind(InviteStatus::Accepted)
            .bind(invite.accepted_at.unwrap_or(membership.joined_at))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(&self, project: &Project, statuses: &[ProjectStatus]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO projects
                (id, team_id, owner_id, name, description, is_archived, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id)
        .bind(project.team_id)
        .bind(project.owner_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.is_archived)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&mut *tx)
        .await?;

        for status in statuses {
            sqlx::query(
                r#"
                INSERT INTO project_statuses (id, project_id, name, color, position, wip_limit)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(status.id)
            .bind(status.project_id)
            .bind(&status.name)
            .bind(&status.color)
            .bind(status.position)
            .bind(status.wip_limit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count_active_projects(&self, team_id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM projects WHERE team_id = $1 AND deleted_at IS NULL",
        )
        .bind(team_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_projects(&self, team_id: Uuid) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, team_id, owner_id, name, description, is_archived,
                   created_at, updated_at, deleted_at
            FROM projects
            WHERE team_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn save_project(&self, project: &Project) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE projects
            SET name = $2, description = $3, is_archived = $4, updated_at = $5, deleted_at = $6
            WHERE id = $1
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.is_archived)
        .bind(project.updated_at)
        .bind(project.lifecycle.deleted_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_status(&self, status: &ProjectStatus) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO project_statuses (id, project_id, name, color, position, wip_limit)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(status.id)
        .bind(status.project_id)
        .bind(&status.name)
        .bind(&status.color)
        .bind(status.position)
        .bind(status.wip_limit)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_statuses(&self, project_id: Uuid) -> StoreResult<Vec<ProjectStatus>> {
        let statuses = sqlx::query_as::<_, ProjectStatus>(
            r#"
            SELECT id, project_id, name, color, position, wip_limit
            FROM project_statuses
            WHERE project_id = $1
            ORDER BY position
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(statuses)
    }

    async fn insert_label(&self, label: &IssueLabel) -> StoreResult<()> {
        sqlx::query("INSERT INTO issue_labels (id, project_id, name, color) VALUES ($1, $2, $3, $4)")
            .bind(label.id)
            .bind(label.project_id)
            .bind(&label.name)
            .bind(&label.color)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_labels(&self, project_id: Uuid) -> StoreResult<Vec<IssueLabel>> {
        let labels = sqlx::query_as::<_, IssueLabel>(
            "SELECT id, project_id, name, color FROM issue_labels WHERE project_id = $1 ORDER BY name",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(labels)
    }

    async fn insert_favorite(&self, favorite: &ProjectFavorite) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO project_favorites (user_id, project_id, created_at) VALUES ($1, $2, $3)",
        )
        .bind(favorite.user_id)
        .bind(favorite.project_id)
        .bind(favorite.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "project already favorited"))?;

        Ok(())
    }

    async fn delete_favorite(&self, user_id: Uuid, project_id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM project_favorites WHERE user_id = $1 AND project_id = $2")
                .bind(user_id)
                .bind(project_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_favorite(&self, user_id: Uuid, project_id: Uuid) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM project_favorites WHERE user_id = $1 AND project_id = $2)",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait]
impl IssueStore for PgStore {
    async fn insert_issue(&self, issue: &Issue, label_ids: &[Uuid]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO issues
                (id, project_id, creator_id, assignee_id, title, description, status,
                 priority, position, due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(issue.id)
        .bind(issue.project_id)
        .bind(issue.creator_id)
        .bind(issue.assignee_id)
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(&issue.status)
        .bind(issue.priority)
        .bind(issue.position)
        .bind(issue.due_date)
        .bind(issue.created_at)
        .bind(issue.updated_at)
        .execute(&mut *tx)
        .await?;

        for label_id in label_ids {
            sqlx::query("INSERT INTO issue_label_links (issue_id, label_id) VALUES ($1, $2)")
                .bind(issue.id)
                .bind(label_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count_active_issues(&self, project_id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM issues WHERE project_id = $1 AND deleted_at IS NULL",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn apply_issue_update(&self, issue: &Issue, history: &[IssueHistory]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE issues
            SET title = $2, description = $3, assignee_id = $4, status = $5, priority = $6,
                position = $7, due_date = $8, ai_summary = $9, ai_suggestion = $10,
                ai_summary_cached_at = $11, updated_at = $12, deleted_at = $13
            WHERE id = $1
            "#,
        )
        .bind(issue.id)
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(issue.assignee_id)
        .bind(&issue.status)
        .bind(issue.priority)
        .bind(issue.position)
        .bind(issue.due_date)
        .bind(&issue.ai.summary)
        .bind(&issue.ai.suggestion)
        .bind(issue.ai.cached_at)
        .bind(issue.updated_at)
        .bind(issue.lifecycle.deleted_at())
        .execute(&mut *tx)
        .await?;

        for entry in history {
            sqlx::query(
                r#"
                INSERT INTO issue_history (id, issue_id, actor_id, field, old_value, new_value, changed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(entry.id)
            .bind(entry.issue_id)
            .bind(entry.actor_id)
            .bind(entry.field)
            .bind(&entry.old_value)
            .bind(&entry.new_value)
            .bind(entry.changed_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_issues(&self, project_id: Uuid, filter: &IssueFilter) -> StoreResult<Vec<Issue>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM issues
            WHERE project_id = $1 AND deleted_at IS NULL
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR assignee_id = $3)
              AND ($4::issue_priority IS NULL OR priority = $4)
            ORDER BY created_at DESC
            "#,
            ISSUE_COLUMNS
        );
        let rows = sqlx::query_as::<_, IssueRow>(&sql)
            .bind(project_id)
            .bind(&filter.status)
            .bind(filter.assignee_id)
            .bind(filter.priority)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Issue::from).collect())
    }

    async fn labels_for_issue(&self, issue_id: Uuid) -> StoreResult<Vec<IssueLabel>> {
        let labels = sqlx::query_as::<_, IssueLabel>(
            r#"
            SELECT l.id, l.project_id, l.name, l.color
            FROM issue_labels l
            JOIN issue_label_links x ON x.label_id = l.id
            WHERE x.issue_id = $1
            ORDER BY l.name
            "#,
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(labels)
    }

    async fn count_subtasks(&self, issue_id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subtasks WHERE issue_id = $1")
            .bind(issue_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn insert_subtask(&self, subtask: &Subtask) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subtasks (id, issue_id, title, is_completed, position, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(subtask.id)
        .bind(subtask.issue_id)
        .bind(&subtask.title)
        .bind(subtask.is_completed)
        .bind(subtask.position)
        .bind(subtask.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_subtask(&self, issue_id: Uuid, subtask_id: Uuid) -> StoreResult<Option<Subtask>> {
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            SELECT id, issue_id, title, is_completed, position, created_at
            FROM subtasks
            WHERE id = $1 AND issue_id = $2
            "#,
        )
        .bind(subtask_id)
        .bind(issue_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subtask)
    }

    async fn save_subtask(&self, subtask: &Subtask) -> StoreResult<()> {
        sqlx::query("UPDATE subtasks SET title = $2, is_completed = $3, position = $4 WHERE id = $1")
            .bind(subtask.id)
            .bind(&subtask.title)
            .bind(subtask.is_completed)
            .bind(subtask.position)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_subtasks(&self, issue_id: Uuid) -> StoreResult<Vec<Subtask>> {
        let subtasks = sqlx::query_as::<_, Subtask>(
            r#"
            SELECT id, issue_id, title, is_completed, position, created_at
            FROM subtasks
            WHERE issue_id = $1
            ORDER BY position, created_at
            "#,
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subtasks)
    }

    async fn list_history(&self, issue_id: Uuid) -> StoreResult<Vec<IssueHistory>> {
        let history = sqlx::query_as::<_, IssueHistory>(
            r#"
            SELECT id, issue_id, actor_id, field, old_value, new_value, changed_at
            FROM issue_history
            WHERE issue_id = $1
            ORDER BY changed_at
            "#,
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(history)
    }

    async fn store_ai_summary(
        &self,
        issue_id: Uuid,
        summary: &str,
        cached_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE issues SET ai_summary = $2, ai_summary_cached_at = $3 WHERE id = $1")
            .bind(issue_id)
            .bind(summary)
            .bind(cached_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn store_ai_suggestion(&self, issue_id: Uuid, suggestion: &str) -> StoreResult<()> {
        sqlx::query("UPDATE issues SET ai_suggestion = $2 WHERE id = $1")
            .bind(issue_id)
            .bind(suggestion)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, issue_id, author_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(comment.id)
        .bind(comment.issue_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, issue_id, author_id, content, created_at, updated_at, deleted_at
            FROM comments
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Comment::from))
    }

    async fn save_comment(&self, comment: &Comment) -> StoreResult<()> {
        sqlx::query(
            "UPDATE comments SET content = $2, updated_at = $3, deleted_at = $4 WHERE id = $1",
        )
        .bind(comment.id)
        .bind(&comment.content)
        .bind(comment.updated_at)
        .bind(comment.lifecycle.deleted_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_comments(&self, issue_id: Uuid) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, issue_id, author_id, content, created_at, updated_at, deleted_at
            FROM comments
            WHERE issue_id = $1 AND deleted_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, content, is_read, issue_id, team_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(notification.is_read)
        .bind(notification.issue_id)
        .bind(notification.team_id)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, content, is_read, issue_id, team_id, created_at
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn count_unread(&self, user_id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
