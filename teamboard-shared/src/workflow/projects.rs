/// Projects, board statuses and labels
///
/// Any team member may create a project and becomes its owner. Editing,
/// archiving, deleting and board configuration need project edit permission
/// (project owner, or team OWNER/ADMIN). Favorites are per user and only need
/// project access.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::limits::{count_to_u32, LimitType};
use crate::auth::authorization::AccessResolver;
use crate::db::store::Store;
use crate::error::{CoreError, CoreResult, StoreError};
use crate::models::project::{
    IssueLabel, LabelInput, Project, ProjectFavorite, ProjectInput, ProjectStatus, ProjectView,
    StatusInput,
};

#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn Store>,
    access: AccessResolver,
}

impl ProjectService {
    pub fn new(store: Arc<dyn Store>, access: AccessResolver) -> Self {
        Self { store, access }
    }

    /// Creates a project with the default status columns
    ///
    /// # Errors
    ///
    /// - `NotFound` if the caller is not a member of the team
    /// - `Validation` for bad input or when the team already has 15 active projects
    pub async fn create_project(
        &self,
        actor_id: Uuid,
        team_id: Uuid,
        input: ProjectInput,
    ) -> CoreResult<Project> {
        input.validate()?;
        self.access.verify_team_membership(actor_id, team_id).await?;

        let active = self.store.count_active_projects(team_id).await?;
        LimitType::ProjectsPerTeam.ensure_below(count_to_u32(active))?;

        let project = Project::new(team_id, actor_id, input);
        let statuses = ProjectStatus::defaults_for(project.id);
        self.store.create_project(&project, &statuses).await?;

        info!(project_id = %project.id, team_id = %team_id, user_id = %actor_id, "Project created");
        Ok(project)
    }

    /// Project with its active issue count and the caller's favorite flag
    pub async fn get_project(&self, actor_id: Uuid, project_id: Uuid) -> CoreResult<ProjectView> {
        let project = self.access.verify_project_access(actor_id, project_id).await?.project;

        let issue_count = self.store.count_active_issues(project_id).await?;
        let is_favorited = self.store.is_favorite(actor_id, project_id).await?;

        Ok(ProjectView {
            project,
            issue_count,
            is_favorited,
        })
    }

    /// Active projects of a team, archived ones included
    pub async fn list_projects(&self, actor_id: Uuid, team_id: Uuid) -> CoreResult<Vec<Project>> {
        self.access.verify_team_membership(actor_id, team_id).await?;
        Ok(self.store.list_projects(team_id).await?)
    }

    pub async fn update_project(
        &self,
        actor_id: Uuid,
        project_id: Uuid,
        input: ProjectInput,
    ) -> CoreResult<Project> {
        input.validate()?;
        let mut project = self
            .access
            .verify_project_edit_permission(actor_id, project_id)
            .await?
            .project;

        project.name = input.name;
        project.description = input.description;
        project.updated_at = Utc::now();
        self.store.save_project(&project).await?;

        info!(project_id = %project_id, user_id = %actor_id, "Project updated");
        Ok(project)
    }

    /// Soft-deletes a project once the caller retypes its name
    pub async fn delete_project(
        &self,
        actor_id: Uuid,
        project_id: Uuid,
        confirmation: &str,
    ) -> CoreResult<()> {
        let mut project = self
            .access
            .verify_project_edit_permission(actor_id, project_id)
            .await?
            .project;

        if confirmation != project.name {
            return Err(CoreError::validation(
                "Confirmation does not match the project name",
            ));
        }

        let now = Utc::now();
        project.lifecycle = project.lifecycle.delete(now);
        project.updated_at = now;
        self.store.save_project(&project).await?;

        info!(project_id = %project_id, user_id = %actor_id, "Project deleted");
        Ok(())
    }

    pub async fn archive_project(&self, actor_id: Uuid, project_id: Uuid) -> CoreResult<Project> {
        self.set_archived(actor_id, project_id, true).await
    }

    pub async fn unarchive_project(&self, actor_id: Uuid, project_id: Uuid) -> CoreResult<Project> {
        self.set_archived(actor_id, project_id, false).await
    }

    /// Appends a status column after the existing ones
    ///
    /// The WIP limit is stored as given and never enforced.
    pub async fn add_status(
        &self,
        actor_id: Uuid,
        project_id: Uuid,
        input: StatusInput,
    ) -> CoreResult<ProjectStatus> {
        input.validate()?;
        self.access.verify_project_edit_permission(actor_id, project_id).await?;

        let existing = self.store.list_statuses(project_id).await?;
        if existing.iter().any(|s| s.name == input.name) {
            return Err(CoreError::validation(format!(
                "Status '{}' already exists in this project",
                input.name
            )));
        }

        let status = ProjectStatus {
            id: Uuid::new_v4(),
            project_id,
            name: input.name,
            color: input.color,
            position: existing.len() as i32,
            wip_limit: input.wip_limit,
        };
        self.store.insert_status(&status).await?;

        info!(project_id = %project_id, status = %status.name, "Project status added");
        Ok(status)
    }

    /// Status columns in board order
    pub async fn list_statuses(&self, actor_id: Uuid, project_id: Uuid) -> CoreResult<Vec<ProjectStatus>> {
        self.access.verify_project_access(actor_id, project_id).await?;
        Ok(self.store.list_statuses(project_id).await?)
    }

    pub async fn create_label(
        &self,
        actor_id: Uuid,
        project_id: Uuid,
        input: LabelInput,
    ) -> CoreResult<IssueLabel> {
        input.validate()?;
        self.access.verify_project_edit_permission(actor_id, project_id).await?;

        let label = IssueLabel {
            id: Uuid::new_v4(),
            project_id,
            name: input.name,
            color: input.color,
        };
        self.store.insert_label(&label).await?;

        info!(project_id = %project_id, label_id = %label.id, "Label created");
        Ok(label)
    }

    pub async fn list_labels(&self, actor_id: Uuid, project_id: Uuid) -> CoreResult<Vec<IssueLabel>> {
        self.access.verify_project_access(actor_id, project_id).await?;
        Ok(self.store.list_labels(project_id).await?)
    }

    /// Adds the project to the caller's favorites
    ///
    /// # Errors
    ///
    /// - `NotFound` if the caller cannot see the project
    /// - `Validation` if it is already a favorite
    pub async fn favorite_project(&self, actor_id: Uuid, project_id: Uuid) -> CoreResult<()> {
        self.access.verify_project_access(actor_id, project_id).await?;

        match self
            .store
            .insert_favorite(&ProjectFavorite::new(actor_id, project_id))
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(CoreError::validation("Project already in favorites"));
            }
            Err(e) => return Err(e.into()),
        }

        debug!(project_id = %project_id, user_id = %actor_id, "Project favorited");
        Ok(())
    }

    /// Removes the project from the caller's favorites
    ///
    /// Works on projects the caller can no longer see, so stale favorites can
    /// always be cleared. `NotFound` if it was not a favorite.
    pub async fn unfavorite_project(&self, actor_id: Uuid, project_id: Uuid) -> CoreResult<()> {
        if !self.store.delete_favorite(actor_id, project_id).await? {
            return Err(CoreError::not_found("Project not in favorites"));
        }

        debug!(project_id = %project_id, user_id = %actor_id, "Project unfavorited");
        Ok(())
    }

    async fn set_archived(&self, actor_id: Uuid, project_id: Uuid, archived: bool) -> CoreResult<Project> {
        let mut project = self
            .access
            .verify_project_edit_permission(actor_id, project_id)
            .await?
            .project;

        project.is_archived = archived;
        project.updated_at = Utc::now();
        self.store.save_project(&project).await?;

        info!(project_id = %project_id, user_id = %actor_id, archived, "Project archive flag changed");
        Ok(project)
    }
}
