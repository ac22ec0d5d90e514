/// Issue workflow
///
/// Applies issue mutations after access has been resolved, enforces creation
/// limits, appends field-level history and emits events for the notification
/// dispatcher.
///
/// # Mutation rules
///
/// - Every update compares title, assignee, status and priority with their prior
///   values and appends one history row per changed field (zero to four rows).
/// - Any description edit clears the AI cache, even when the text is unchanged.
/// - Positions are taken as given: no collision detection and no reindexing.
/// - Limits apply at creation only (200 issues per project, 20 subtasks per
///   issue, 5 labels per issue).
///
/// The issue row and its history rows are written as one unit. The notification
/// for a new issue is emitted afterwards and can be lost without affecting the
/// issue.
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::models::issue::CreateIssue;
/// use teamboard_shared::workflow::WorkflowEngine;
/// use uuid::Uuid;
///
/// # async fn example(engine: WorkflowEngine, user: Uuid, project: Uuid) -> teamboard_shared::error::CoreResult<()> {
/// let view = engine
///     .create_issue(user, project, CreateIssue {
///         title: "Crash on login".to_string(),
///         ..Default::default()
///     })
///     .await?;
/// assert_eq!(view.issue.status, "Backlog");
/// # Ok(())
/// # }
/// ```

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::history;
use super::limits::{count_to_u32, LimitType};
use crate::auth::authorization::AccessResolver;
use crate::db::store::Store;
use crate::error::{CoreError, CoreResult};
use crate::models::history::IssueHistory;
use crate::models::issue::{
    CreateIssue, Issue, IssueFilter, IssueView, StatusUpdate, Subtask, SubtaskInput, UpdateIssue,
};
use crate::models::project::DEFAULT_STATUSES;
use crate::notify::events::{EventSink, WorkflowEvent};

/// Issue, subtask and history operations
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn Store>,
    access: AccessResolver,
    events: EventSink,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn Store>, access: AccessResolver, events: EventSink) -> Self {
        Self {
            store,
            access,
            events,
        }
    }

    /// Creates an issue in the project's first status column
    ///
    /// # Errors
    ///
    /// - `NotFound` if the project is not visible to the caller
    /// - `Validation` for bad input, a full project, more than five labels,
    ///   labels from another project or an assignee outside the team
    pub async fn create_issue(
        &self,
        actor_id: Uuid,
        project_id: Uuid,
        input: CreateIssue,
    ) -> CoreResult<IssueView> {
        input.validate()?;
        let access = self.access.verify_project_access(actor_id, project_id).await?;

        let active = self.store.count_active_issues(project_id).await?;
        LimitType::IssuesPerProject.ensure_below(count_to_u32(active))?;

        let label_ids = self.resolve_labels(access.project.id, &input.label_ids).await?;
        if let Some(assignee) = input.assignee_id {
            self.ensure_team_member(access.project.team_id, assignee).await?;
        }

        let status = self.initial_status(project_id).await?;
        let issue = Issue::new(project_id, actor_id, status, &input);
        self.store.insert_issue(&issue, &label_ids).await?;

        info!(
            issue_id = %issue.id,
            project_id = %project_id,
            user_id = %actor_id,
            labels = label_ids.len(),
            "Issue created"
        );

        self.events.emit(WorkflowEvent::IssueCreated {
            issue_id: issue.id,
            title: issue.title.clone(),
            creator_id: issue.creator_id,
            assignee_id: issue.assignee_id,
        });

        self.view(issue).await
    }

    /// Issue read model
    pub async fn get_issue(&self, actor_id: Uuid, issue_id: Uuid) -> CoreResult<IssueView> {
        let access = self.access.verify_issue_access(actor_id, issue_id).await?;
        self.view(access.issue).await
    }

    /// Active issues of a project matching `filter`, newest first
    pub async fn list_issues(
        &self,
        actor_id: Uuid,
        project_id: Uuid,
        filter: IssueFilter,
    ) -> CoreResult<Vec<IssueView>> {
        self.access.verify_project_access(actor_id, project_id).await?;

        let issues = self.store.list_issues(project_id, &filter).await?;
        let mut views = Vec::with_capacity(issues.len());
        for issue in issues {
            views.push(self.view(issue).await?);
        }
        Ok(views)
    }

    /// Applies a partial update and records the audited changes
    pub async fn update_issue(
        &self,
        actor_id: Uuid,
        issue_id: Uuid,
        update: UpdateIssue,
    ) -> CoreResult<IssueView> {
        update.validate()?;
        let access = self.access.verify_issue_access(actor_id, issue_id).await?;
        let before = access.issue.clone();
        let mut after = access.issue.clone();

        if let Some(title) = update.title {
            after.title = title;
        }
        if let Some(description) = update.description {
            after.set_description(Some(description));
        }
        if let Some(assignee) = update.assignee {
            // Resending the current assignee is not a reassignment
            if let Some(user_id) = assignee.filter(|id| Some(*id) != before.assignee_id) {
                self.ensure_team_member(access.project.team_id, user_id).await?;
            }
            after.assignee_id = assignee;
        }
        if let Some(status) = update.status {
            self.ensure_status(access.project.id, &status).await?;
            after.status = status;
        }
        if let Some(priority) = update.priority {
            after.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            after.due_date = due_date;
        }

        self.commit(actor_id, &before, after).await
    }

    /// Board move: new status and, optionally, a new position
    pub async fn update_status(
        &self,
        actor_id: Uuid,
        issue_id: Uuid,
        update: StatusUpdate,
    ) -> CoreResult<IssueView> {
        update.validate()?;
        let access = self.access.verify_issue_access(actor_id, issue_id).await?;
        self.ensure_status(access.project.id, &update.status).await?;

        let before = access.issue.clone();
        let mut after = access.issue;
        after.status = update.status;
        if let Some(position) = update.position {
            after.position = position;
        }

        self.commit(actor_id, &before, after).await
    }

    /// Soft-deletes an issue
    ///
    /// Allowed for the creator and for anyone who may edit the project.
    pub async fn delete_issue(&self, actor_id: Uuid, issue_id: Uuid) -> CoreResult<IssueView> {
        let access = self.access.verify_issue_access(actor_id, issue_id).await?;

        if access.issue.creator_id != actor_id && !access.can_edit_project() {
            return Err(CoreError::forbidden(
                "Only the issue creator, project owner or team admin can delete this issue",
            ));
        }

        let mut issue = access.issue;
        let now = Utc::now();
        issue.lifecycle = issue.lifecycle.delete(now);
        issue.updated_at = now;
        self.store.apply_issue_update(&issue, &[]).await?;

        info!(issue_id = %issue_id, user_id = %actor_id, "Issue deleted");
        self.view(issue).await
    }

    /// Audit trail, oldest first
    pub async fn issue_history(&self, actor_id: Uuid, issue_id: Uuid) -> CoreResult<Vec<IssueHistory>> {
        self.access.verify_issue_access(actor_id, issue_id).await?;
        Ok(self.store.list_history(issue_id).await?)
    }

    /// Appends a checklist entry (at most 20 per issue)
    pub async fn create_subtask(
        &self,
        actor_id: Uuid,
        issue_id: Uuid,
        input: SubtaskInput,
    ) -> CoreResult<Subtask> {
        input.validate()?;
        self.access.verify_issue_access(actor_id, issue_id).await?;

        let existing = count_to_u32(self.store.count_subtasks(issue_id).await?);
        LimitType::SubtasksPerIssue.ensure_below(existing)?;

        let subtask = Subtask {
            id: Uuid::new_v4(),
            issue_id,
            title: input.title,
            is_completed: false,
            position: existing as i32,
            created_at: Utc::now(),
        };
        self.store.insert_subtask(&subtask).await?;

        debug!(issue_id = %issue_id, subtask_id = %subtask.id, "Subtask created");
        Ok(subtask)
    }

    /// Flips the completed flag
    pub async fn toggle_subtask(
        &self,
        actor_id: Uuid,
        issue_id: Uuid,
        subtask_id: Uuid,
    ) -> CoreResult<Subtask> {
        self.access.verify_issue_access(actor_id, issue_id).await?;

        let mut subtask = self
            .store
            .find_subtask(issue_id, subtask_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Subtask not found"))?;
        subtask.is_completed = !subtask.is_completed;
        self.store.save_subtask(&subtask).await?;

        Ok(subtask)
    }

    async fn commit(&self, actor_id: Uuid, before: &Issue, mut after: Issue) -> CoreResult<IssueView> {
        let now = Utc::now();
        let changes = history::diff(before, &after, actor_id, now);
        after.updated_at = now;

        self.store.apply_issue_update(&after, &changes).await?;

        info!(
            issue_id = %after.id,
            user_id = %actor_id,
            history_rows = changes.len(),
            "Issue updated"
        );
        self.view(after).await
    }

    /// Joins the issue with labels, subtasks and display names
    async fn view(&self, issue: Issue) -> CoreResult<IssueView> {
        let labels = self.store.labels_for_issue(issue.id).await?;
        let subtasks = self.store.list_subtasks(issue.id).await?;

        let assignee_name = match issue.assignee_id {
            Some(id) => self.store.find_user(id).await?.map(|u| u.name),
            None => None,
        };
        let creator_name = self.store.find_user(issue.creator_id).await?.map(|u| u.name);

        Ok(IssueView {
            issue,
            labels,
            subtasks,
            assignee_name,
            creator_name,
        })
    }

    async fn initial_status(&self, project_id: Uuid) -> CoreResult<String> {
        let statuses = self.store.list_statuses(project_id).await?;
        Ok(statuses
            .into_iter()
            .next()
            .map(|s| s.name)
            .unwrap_or_else(|| DEFAULT_STATUSES[0].to_string()))
    }

    async fn ensure_status(&self, project_id: Uuid, status: &str) -> CoreResult<()> {
        let statuses = self.store.list_statuses(project_id).await?;
        if statuses.iter().any(|s| s.name == status) {
            Ok(())
        } else {
            Err(CoreError::validation(format!(
                "Unknown status '{}' for this project",
                status
            )))
        }
    }

    async fn ensure_team_member(&self, team_id: Uuid, user_id: Uuid) -> CoreResult<()> {
        match self.store.find_membership(team_id, user_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::validation("Assignee must be a member of the team")),
        }
    }

    /// Deduplicates the requested labels and checks they belong to the project
    async fn resolve_labels(&self, project_id: Uuid, requested: &[Uuid]) -> CoreResult<Vec<Uuid>> {
        let mut seen = HashSet::new();
        let unique: Vec<Uuid> = requested.iter().copied().filter(|id| seen.insert(*id)).collect();

        LimitType::LabelsPerIssue.ensure_at_most(unique.len() as u32)?;
        if unique.is_empty() {
            return Ok(unique);
        }

        let known: HashSet<Uuid> = self
            .store
            .list_labels(project_id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();
        if let Some(unknown) = unique.iter().find(|id| !known.contains(id)) {
            return Err(CoreError::validation(format!(
                "Label {} does not belong to this project",
                unknown
            )));
        }

        Ok(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::store::{IssueStore, ProjectStore, TeamStore};
    use crate::error::ErrorKind;
    use crate::models::history::HistoryField;
    use crate::models::issue::IssuePriority;
    use crate::models::membership::{Membership, TeamRole};
    use crate::models::project::{IssueLabel, Project, ProjectInput, ProjectStatus};
    use crate::models::team::{Team, TeamInvite};
    use crate::notify::events::EventReceiver;

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: WorkflowEngine,
        events: EventReceiver,
        owner: Uuid,
        team: Team,
        project: Project,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let team = Team::new("Platform".into(), owner);
        store
            .create_team(&team, &Membership::new(team.id, owner, TeamRole::Owner))
            .await
            .unwrap();
        let project = Project::new(
            team.id,
            owner,
            ProjectInput {
                name: "Website".into(),
                description: None,
            },
        );
        store
            .create_project(&project, &ProjectStatus::defaults_for(project.id))
            .await
            .unwrap();

        let (sink, events) = EventSink::channel();
        let engine = WorkflowEngine::new(store.clone(), AccessResolver::new(store.clone()), sink);

        Fixture {
            store,
            engine,
            events,
            owner,
            team,
            project,
        }
    }

    async fn add_member(f: &Fixture, role: TeamRole) -> Uuid {
        let user = Uuid::new_v4();
        let invite = TeamInvite::pending(f.team.id, "dev@example.com", Uuid::new_v4().to_string(), f.owner);
        f.store
            .accept_invite(&invite, &Membership::new(f.team.id, user, role))
            .await
            .unwrap();
        user
    }

    fn titled(title: &str) -> CreateIssue {
        CreateIssue {
            title: title.to_string(),
            description: Some("Steps to reproduce are in the ticket".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_issue_lands_in_first_status_and_emits_event() {
        let mut f = fixture().await;
        let assignee = add_member(&f, TeamRole::Member).await;

        let view = f
            .engine
            .create_issue(
                f.owner,
                f.project.id,
                CreateIssue {
                    assignee_id: Some(assignee),
                    ..titled("Broken footer")
                },
            )
            .await
            .unwrap();

        assert_eq!(view.issue.status, "Backlog");
        assert_eq!(view.issue.assignee_id, Some(assignee));

        match f.events.try_recv().unwrap() {
            WorkflowEvent::IssueCreated { issue_id, assignee_id, .. } => {
                assert_eq!(issue_id, view.issue.id);
                assert_eq!(assignee_id, Some(assignee));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_two_hundred_first_issue_rejected() {
        let f = fixture().await;
        for i in 0..200 {
            let issue = Issue::new(f.project.id, f.owner, "Backlog".into(), &titled(&format!("Issue {}", i)));
            f.store.insert_issue(&issue, &[]).await.unwrap();
        }

        let err = f
            .engine
            .create_issue(f.owner, f.project.id, titled("One too many"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_deleted_issues_free_capacity() {
        let f = fixture().await;
        let mut last = None;
        for i in 0..200 {
            let issue = Issue::new(f.project.id, f.owner, "Backlog".into(), &titled(&format!("Issue {}", i)));
            f.store.insert_issue(&issue, &[]).await.unwrap();
            last = Some(issue.id);
        }

        f.engine.delete_issue(f.owner, last.unwrap()).await.unwrap();
        assert!(f
            .engine
            .create_issue(f.owner, f.project.id, titled("Fits again"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_non_member_cannot_create() {
        let f = fixture().await;
        let err = f
            .engine
            .create_issue(Uuid::new_v4(), f.project.id, titled("Sneaky"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_records_one_row_per_changed_field() {
        let f = fixture().await;
        let member = add_member(&f, TeamRole::Member).await;
        let view = f.engine.create_issue(f.owner, f.project.id, titled("Slow search")).await.unwrap();

        f.engine
            .update_issue(
                f.owner,
                view.issue.id,
                UpdateIssue {
                    title: Some("Slow search on mobile".into()),
                    assignee: Some(Some(member)),
                    status: Some("In Progress".into()),
                    priority: Some(IssuePriority::High),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let history = f.engine.issue_history(f.owner, view.issue.id).await.unwrap();
        let fields: Vec<HistoryField> = history.iter().map(|h| h.field).collect();
        assert_eq!(
            fields,
            vec![
                HistoryField::Title,
                HistoryField::Assignee,
                HistoryField::Status,
                HistoryField::Priority
            ]
        );
        assert_eq!(history[2].old_value.as_deref(), Some("Backlog"));
        assert_eq!(history[2].new_value.as_deref(), Some("In Progress"));
        assert_eq!(history[1].new_value, Some(member.to_string()));
    }

    #[tokio::test]
    async fn test_unchanged_values_record_nothing() {
        let f = fixture().await;
        let view = f.engine.create_issue(f.owner, f.project.id, titled("Typo")).await.unwrap();

        f.engine
            .update_issue(
                f.owner,
                view.issue.id,
                UpdateIssue {
                    title: Some("Typo".into()),
                    priority: Some(IssuePriority::Medium),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(f.engine.issue_history(f.owner, view.issue.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_description_edit_clears_ai_cache_even_when_unchanged() {
        let f = fixture().await;
        let view = f.engine.create_issue(f.owner, f.project.id, titled("Crash")).await.unwrap();
        f.store
            .store_ai_summary(view.issue.id, "A crash.", Utc::now())
            .await
            .unwrap();
        f.store.store_ai_suggestion(view.issue.id, "Restart it.").await.unwrap();

        let updated = f
            .engine
            .update_issue(
                f.owner,
                view.issue.id,
                UpdateIssue {
                    description: view.issue.description.clone(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.issue.ai.is_empty());
        let stored = f.engine.get_issue(f.owner, view.issue.id).await.unwrap();
        assert!(stored.issue.ai.is_empty());
        assert!(f.engine.issue_history(f.owner, view.issue.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_status_rejected() {
        let f = fixture().await;
        let view = f.engine.create_issue(f.owner, f.project.id, titled("Crash")).await.unwrap();

        let err = f
            .engine
            .update_status(
                f.owner,
                view.issue.id,
                StatusUpdate {
                    status: "Shipped".into(),
                    position: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_board_positions_may_collide() {
        let f = fixture().await;
        let a = f.engine.create_issue(f.owner, f.project.id, titled("A")).await.unwrap();
        let b = f.engine.create_issue(f.owner, f.project.id, titled("B")).await.unwrap();

        for id in [a.issue.id, b.issue.id] {
            f.engine
                .update_status(
                    f.owner,
                    id,
                    StatusUpdate {
                        status: "In Progress".into(),
                        position: Some(3),
                    },
                )
                .await
                .unwrap();
        }

        let moved = f
            .engine
            .list_issues(
                f.owner,
                f.project.id,
                IssueFilter {
                    status: Some("In Progress".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.len(), 2);
        assert!(moved.iter().all(|v| v.issue.position == 3));
    }

    #[tokio::test]
    async fn test_more_than_five_labels_rejected() {
        let f = fixture().await;
        let mut label_ids = Vec::new();
        for i in 0..6 {
            let label = IssueLabel {
                id: Uuid::new_v4(),
                project_id: f.project.id,
                name: format!("label-{}", i),
                color: "#336699".into(),
            };
            f.store.insert_label(&label).await.unwrap();
            label_ids.push(label.id);
        }

        let err = f
            .engine
            .create_issue(
                f.owner,
                f.project.id,
                CreateIssue {
                    label_ids: label_ids.clone(),
                    ..titled("Too colorful")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        label_ids.truncate(5);
        let view = f
            .engine
            .create_issue(
                f.owner,
                f.project.id,
                CreateIssue {
                    label_ids,
                    ..titled("Just right")
                },
            )
            .await
            .unwrap();
        assert_eq!(view.labels.len(), 5);
    }

    #[tokio::test]
    async fn test_assignee_outside_team_rejected() {
        let f = fixture().await;
        let err = f
            .engine
            .create_issue(
                f.owner,
                f.project.id,
                CreateIssue {
                    assignee_id: Some(Uuid::new_v4()),
                    ..titled("Orphan")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_departed_assignee_does_not_block_edits() {
        let f = fixture().await;
        let assignee = add_member(&f, TeamRole::Member).await;
        let view = f
            .engine
            .create_issue(
                f.owner,
                f.project.id,
                CreateIssue {
                    assignee_id: Some(assignee),
                    ..titled("Flaky deploy")
                },
            )
            .await
            .unwrap();

        assert!(f.store.delete_membership(f.team.id, assignee).await.unwrap());

        let updated = f
            .engine
            .update_issue(
                f.owner,
                view.issue.id,
                UpdateIssue {
                    title: Some("Flaky deploy on Fridays".into()),
                    assignee: Some(Some(assignee)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.issue.assignee_id, Some(assignee));

        let history = f.engine.issue_history(f.owner, view.issue.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].field, HistoryField::Title);

        // Reassigning to someone who left is still rejected
        let other = add_member(&f, TeamRole::Member).await;
        f.engine
            .update_issue(
                f.owner,
                view.issue.id,
                UpdateIssue {
                    assignee: Some(Some(other)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = f
            .engine
            .update_issue(
                f.owner,
                view.issue.id,
                UpdateIssue {
                    assignee: Some(Some(assignee)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_subtasks_capped_and_toggled() {
        let f = fixture().await;
        let view = f.engine.create_issue(f.owner, f.project.id, titled("Release")).await.unwrap();

        for i in 0..20 {
            let subtask = f
                .engine
                .create_subtask(
                    f.owner,
                    view.issue.id,
                    SubtaskInput {
                        title: format!("Step {}", i),
                    },
                )
                .await
                .unwrap();
            assert_eq!(subtask.position, i);
        }

        let err = f
            .engine
            .create_subtask(
                f.owner,
                view.issue.id,
                SubtaskInput {
                    title: "Step 21".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let first = f.store.list_subtasks(view.issue.id).await.unwrap().remove(0);
        let toggled = f.engine.toggle_subtask(f.owner, view.issue.id, first.id).await.unwrap();
        assert!(toggled.is_completed);
        let toggled = f.engine.toggle_subtask(f.owner, view.issue.id, first.id).await.unwrap();
        assert!(!toggled.is_completed);

        let err = f
            .engine
            .toggle_subtask(f.owner, view.issue.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_permissions() {
        let f = fixture().await;
        let author = add_member(&f, TeamRole::Member).await;
        let bystander = add_member(&f, TeamRole::Member).await;
        let view = f.engine.create_issue(author, f.project.id, titled("Mine")).await.unwrap();

        let err = f.engine.delete_issue(bystander, view.issue.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        f.engine.delete_issue(author, view.issue.id).await.unwrap();
        let err = f.engine.get_issue(f.owner, view.issue.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
