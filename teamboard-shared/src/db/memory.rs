/// In-process [`Store`](super::store::Store) implementation
///
/// Backs the test suite and local development. All tables sit behind one
/// `RwLock`, so every multi-row write is applied as a single unit, the same
/// guarantee [`PgStore`](super::postgres::PgStore) gets from transactions.
///
/// [`MemoryStore::simulate_outage`] makes point lookups on a table fail with
/// [`StoreError::Unavailable`] until the outage is lifted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{
    AccessLookup, CommentStore, IssueStore, NotificationStore, ProjectStore, TeamStore, UserStore,
};
use crate::error::{StoreError, StoreResult};
use crate::models::comment::Comment;
use crate::models::history::IssueHistory;
use crate::models::issue::{Issue, IssueFilter, Subtask};
use crate::models::membership::{MemberView, Membership, TeamRole};
use crate::models::notification::Notification;
use crate::models::project::{IssueLabel, Project, ProjectFavorite, ProjectStatus};
use crate::models::team::{InviteStatus, Team, TeamInvite};
use crate::models::user::User;

/// Tables whose point lookups can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outage {
    Users,
    Issues,
    Comments,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    memberships: HashMap<(Uuid, Uuid), Membership>,
    invites: HashMap<Uuid, TeamInvite>,
    projects: HashMap<Uuid, Project>,
    statuses: Vec<ProjectStatus>,
    labels: HashMap<Uuid, IssueLabel>,
    favorites: HashMap<(Uuid, Uuid), ProjectFavorite>,
    issues: HashMap<Uuid, Issue>,
    issue_labels: Vec<(Uuid, Uuid)>,
    subtasks: HashMap<Uuid, Subtask>,
    history: Vec<IssueHistory>,
    comments: HashMap<Uuid, Comment>,
    notifications: HashMap<Uuid, Notification>,
    /// Insertion order, breaks `created_at` ties in listings
    inserted: HashMap<Uuid, u64>,
    outages: HashSet<Outage>,
}

impl Tables {
    fn stamp(&mut self, id: Uuid) {
        let next = self.inserted.len() as u64;
        self.inserted.entry(id).or_insert(next);
    }

    fn seq(&self, id: &Uuid) -> u64 {
        self.inserted.get(id).copied().unwrap_or(0)
    }

    fn available(&self, table: Outage) -> StoreResult<()> {
        if self.outages.contains(&table) {
            return Err(StoreError::Unavailable(format!("{:?} table unavailable", table)));
        }
        Ok(())
    }
}

/// Store holding everything in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts or lifts a simulated outage of one table
    pub async fn simulate_outage(&self, table: Outage, down: bool) {
        let mut tables = self.tables.write().await;
        if down {
            tables.outages.insert(table);
        } else {
            tables.outages.remove(&table);
        }
    }
}

#[async_trait]
impl AccessLookup for MemoryStore {
    async fn find_team(&self, team_id: Uuid) -> StoreResult<Option<Team>> {
        let tables = self.tables.read().await;
        Ok(tables
            .teams
            .get(&team_id)
            .filter(|t| t.lifecycle.is_active())
            .cloned())
    }

    async fn find_membership(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        let tables = self.tables.read().await;
        let team_active = tables
            .teams
            .get(&team_id)
            .map_or(false, |t| t.lifecycle.is_active());
        if !team_active {
            return Ok(None);
        }
        Ok(tables.memberships.get(&(team_id, user_id)).cloned())
    }

    async fn find_project(&self, project_id: Uuid) -> StoreResult<Option<Project>> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .get(&project_id)
            .filter(|p| p.lifecycle.is_active())
            .cloned())
    }

    async fn find_issue(&self, issue_id: Uuid) -> StoreResult<Option<Issue>> {
        let tables = self.tables.read().await;
        tables.available(Outage::Issues)?;
        Ok(tables
            .issues
            .get(&issue_id)
            .filter(|i| i.lifecycle.is_active())
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        tables.available(Outage::Users)?;
        Ok(tables.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        tables.available(Outage::Users)?;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn create_team(&self, team: &Team, owner: &Membership) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.teams.insert(team.id, team.clone());
        tables
            .memberships
            .insert((owner.team_id, owner.user_id), owner.clone());
        Ok(())
    }

    async fn save_team(&self, team: &Team) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.teams.get_mut(&team.id) {
            Some(stored) => {
                *stored = team.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict(format!("team {} does not exist", team.id))),
        }
    }

    async fn list_teams_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Team>> {
        let tables = self.tables.read().await;
        let mut teams: Vec<Team> = tables
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.teams.get(&m.team_id))
            .filter(|t| t.lifecycle.is_active())
            .cloned()
            .collect();
        teams.sort_by_key(|t| t.created_at);
        Ok(teams)
    }

    async fn update_member_role(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.memberships.get_mut(&(team_id, user_id)) {
            Some(membership) => {
                membership.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_membership(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.memberships.remove(&(team_id, user_id)).is_some())
    }

    async fn list_members(&self, team_id: Uuid) -> StoreResult<Vec<MemberView>> {
        let tables = self.tables.read().await;
        let mut members: Vec<MemberView> = tables
            .memberships
            .values()
            .filter(|m| m.team_id == team_id)
            .filter_map(|m| {
                tables.users.get(&m.user_id).map(|u| MemberView {
                    user_id: u.id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    role: m.role,
                    joined_at: m.joined_at,
                })
            })
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn insert_invite(&self, invite: &TeamInvite) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .invites
            .values()
            .any(|i| i.token_hash == invite.token_hash)
        {
            return Err(StoreError::Conflict("invite token already exists".into()));
        }
        tables.invites.insert(invite.id, invite.clone());
        Ok(())
    }

    async fn find_invite_by_token_hash(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<TeamInvite>> {
        let tables = self.tables.read().await;
        Ok(tables
            .invites
            .values()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn save_invite(&self, invite: &TeamInvite) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.invites.insert(invite.id, invite.clone());
        Ok(())
    }

    async fn accept_invite(&self, invite: &TeamInvite, membership: &Membership) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let key = (membership.team_id, membership.user_id);
        if tables.memberships.contains_key(&key) {
            return Err(StoreError::Conflict("user is already a team member".into()));
        }

        let mut accepted = invite.clone();
        accepted.status = InviteStatus::Accepted;
        if accepted.accepted_at.is_none() {
            accepted.accepted_at = Some(membership.joined_at);
        }
        tables.invites.insert(accepted.id, accepted);
        tables.memberships.insert(key, membership.clone());
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, project: &Project, statuses: &[ProjectStatus]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.projects.insert(project.id, project.clone());
        tables.stamp(project.id);
        tables.statuses.extend(statuses.iter().cloned());
        Ok(())
    }

    async fn count_active_projects(&self, team_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .filter(|p| p.team_id == team_id && p.lifecycle.is_active())
            .count() as i64)
    }

    async fn list_projects(&self, team_id: Uuid) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables
            .projects
            .values()
            .filter(|p| p.team_id == team_id && p.lifecycle.is_active())
            .cloned()
            .collect();
        projects.sort_by_key(|p| std::cmp::Reverse((p.created_at, tables.seq(&p.id))));
        Ok(projects)
    }

    async fn save_project(&self, project: &Project) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.projects.get_mut(&project.id) {
            Some(stored) => {
                *stored = project.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict(format!(
                "project {} does not exist",
                project.id
            ))),
        }
    }

    async fn insert_status(&self, status: &ProjectStatus) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.statuses.push(status.clone());
        Ok(())
    }

    async fn list_statuses(&self, project_id: Uuid) -> StoreResult<Vec<ProjectStatus>> {
        let tables = self.tables.read().await;
        let mut statuses: Vec<ProjectStatus> = tables
            .statuses
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        statuses.sort_by_key(|s| s.position);
        Ok(statuses)
    }

    async fn insert_label(&self, label: &IssueLabel) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.labels.insert(label.id, label.clone());
        Ok(())
    }

    async fn list_labels(&self, project_id: Uuid) -> StoreResult<Vec<IssueLabel>> {
        let tables = self.tables.read().await;
        let mut labels: Vec<IssueLabel> = tables
            .labels
            .values()
            .filter(|l| l.project_id == project_id)
            .cloned()
            .collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(labels)
    }

    async fn insert_favorite(&self, favorite: &ProjectFavorite) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let key = (favorite.user_id, favorite.project_id);
        if tables.favorites.contains_key(&key) {
            return Err(StoreError::Conflict("project already favorited".to_string()));
        }
        tables.favorites.insert(key, favorite.clone());
        Ok(())
    }

    async fn delete_favorite(&self, user_id: Uuid, project_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.favorites.remove(&(user_id, project_id)).is_some())
    }

    async fn is_favorite(&self, user_id: Uuid, project_id: Uuid) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.favorites.contains_key(&(user_id, project_id)))
    }
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn insert_issue(&self, issue: &Issue, label_ids: &[Uuid]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.issues.insert(issue.id, issue.clone());
        tables.stamp(issue.id);
        tables
            .issue_labels
            .extend(label_ids.iter().map(|label_id| (issue.id, *label_id)));
        Ok(())
    }

    async fn count_active_issues(&self, project_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .issues
            .values()
            .filter(|i| i.project_id == project_id && i.lifecycle.is_active())
            .count() as i64)
    }

    async fn apply_issue_update(&self, issue: &Issue, history: &[IssueHistory]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.issues.get_mut(&issue.id) {
            Some(stored) => *stored = issue.clone(),
            None => {
                return Err(StoreError::Conflict(format!(
                    "issue {} does not exist",
                    issue.id
                )))
            }
        }
        tables.history.extend(history.iter().cloned());
        Ok(())
    }

    async fn list_issues(&self, project_id: Uuid, filter: &IssueFilter) -> StoreResult<Vec<Issue>> {
        let tables = self.tables.read().await;
        let mut issues: Vec<Issue> = tables
            .issues
            .values()
            .filter(|i| i.project_id == project_id && i.lifecycle.is_active())
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        issues.sort_by_key(|i| std::cmp::Reverse((i.created_at, tables.seq(&i.id))));
        Ok(issues)
    }

    async fn labels_for_issue(&self, issue_id: Uuid) -> StoreResult<Vec<IssueLabel>> {
        let tables = self.tables.read().await;
        Ok(tables
            .issue_labels
            .iter()
            .filter(|(i, _)| *i == issue_id)
            .filter_map(|(_, label_id)| tables.labels.get(label_id))
            .cloned()
            .collect())
    }

    async fn count_subtasks(&self, issue_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .subtasks
            .values()
            .filter(|s| s.issue_id == issue_id)
            .count() as i64)
    }

    async fn insert_subtask(&self, subtask: &Subtask) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.subtasks.insert(subtask.id, subtask.clone());
        Ok(())
    }

    async fn find_subtask(&self, issue_id: Uuid, subtask_id: Uuid) -> StoreResult<Option<Subtask>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subtasks
            .get(&subtask_id)
            .filter(|s| s.issue_id == issue_id)
            .cloned())
    }

    async fn save_subtask(&self, subtask: &Subtask) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.subtasks.insert(subtask.id, subtask.clone());
        Ok(())
    }

    async fn list_subtasks(&self, issue_id: Uuid) -> StoreResult<Vec<Subtask>> {
        let tables = self.tables.read().await;
        let mut subtasks: Vec<Subtask> = tables
            .subtasks
            .values()
            .filter(|s| s.issue_id == issue_id)
            .cloned()
            .collect();
        subtasks.sort_by_key(|s| (s.position, s.created_at));
        Ok(subtasks)
    }

    async fn list_history(&self, issue_id: Uuid) -> StoreResult<Vec<IssueHistory>> {
        let tables = self.tables.read().await;
        Ok(tables
            .history
            .iter()
            .filter(|h| h.issue_id == issue_id)
            .cloned()
            .collect())
    }

    async fn store_ai_summary(
        &self,
        issue_id: Uuid,
        summary: &str,
        cached_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(issue) = tables.issues.get_mut(&issue_id) {
            issue.ai.summary = Some(summary.to_string());
            issue.ai.cached_at = Some(cached_at);
        }
        Ok(())
    }

    async fn store_ai_suggestion(&self, issue_id: Uuid, suggestion: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(issue) = tables.issues.get_mut(&issue_id) {
            issue.ai.suggestion = Some(suggestion.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.comments.insert(comment.id, comment.clone());
        tables.stamp(comment.id);
        Ok(())
    }

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>> {
        let tables = self.tables.read().await;
        tables.available(Outage::Comments)?;
        Ok(tables
            .comments
            .get(&comment_id)
            .filter(|c| c.lifecycle.is_active())
            .cloned())
    }

    async fn save_comment(&self, comment: &Comment) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn list_comments(&self, issue_id: Uuid) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.issue_id == issue_id && c.lifecycle.is_active())
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, tables.seq(&c.id)));
        Ok(comments)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .notifications
            .insert(notification.id, notification.clone());
        tables.stamp(notification.id);
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut notifications: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        notifications.sort_by_key(|n| std::cmp::Reverse((n.created_at, tables.seq(&n.id))));
        Ok(notifications)
    }

    async fn count_unread(&self, user_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as i64)
    }

    async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.notifications.get_mut(&notification_id) {
            Some(n) if n.user_id == user_id => {
                n.is_read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut flipped = 0;
        for n in tables
            .notifications
            .values_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            flipped += 1;
        }
        Ok(flipped)
    }
}
