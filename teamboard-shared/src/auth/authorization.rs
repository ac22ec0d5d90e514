/// Access resolution for the team → project → issue resource chain
///
/// Every core operation starts here. The resolver is a composed pipeline: each
/// stage consumes the resource resolved by the previous stage and either
/// advances or returns a terminal error.
///
/// ```text
/// issue ──► project ──► team membership ──► role check
/// ```
///
/// # Error asymmetry
///
/// - **NotFound**: the chain could not be resolved, *or* the caller is not a
///   member. The two cases are indistinguishable on purpose.
/// - **Forbidden**: the resource is visible to the caller but the action needs a
///   stronger role (or project ownership).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use teamboard_shared::auth::authorization::AccessResolver;
/// use teamboard_shared::db::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid, issue_id: Uuid) -> teamboard_shared::error::CoreResult<()> {
/// let resolver = AccessResolver::new(Arc::new(MemoryStore::new()));
/// let access = resolver.verify_issue_access(user_id, issue_id).await?;
/// println!("{} in {}", access.issue.title, access.project.name);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::db::store::AccessLookup;
use crate::error::{CoreError, CoreResult};
use crate::models::issue::Issue;
use crate::models::membership::Membership;
use crate::models::project::Project;

const TEAM_NOT_FOUND: &str = "Team not found or you are not a member";
const PROJECT_NOT_FOUND: &str = "Project not found";
const ISSUE_NOT_FOUND: &str = "Issue not found";

/// A project the caller may see, with the caller's membership in its team
#[derive(Debug, Clone)]
pub struct ProjectAccess {
    pub project: Project,
    pub membership: Membership,
}

impl ProjectAccess {
    /// Owner of the project, or OWNER/ADMIN of its team
    pub fn can_edit(&self) -> bool {
        self.project.owner_id == self.membership.user_id
            || self.membership.role.can_edit_any_project()
    }
}

/// An issue the caller may see, with everything resolved on the way to it
#[derive(Debug, Clone)]
pub struct IssueAccess {
    pub issue: Issue,
    pub project: Project,
    pub membership: Membership,
}

impl IssueAccess {
    /// Same rule as [`ProjectAccess::can_edit`] for the issue's project
    pub fn can_edit_project(&self) -> bool {
        self.project.owner_id == self.membership.user_id
            || self.membership.role.can_edit_any_project()
    }
}

/// Resolves access against an [`AccessLookup`] collaborator
#[derive(Clone)]
pub struct AccessResolver {
    lookup: Arc<dyn AccessLookup>,
}

impl AccessResolver {
    pub fn new(lookup: Arc<dyn AccessLookup>) -> Self {
        Self { lookup }
    }

    /// Returns the caller's membership in an active team
    ///
    /// # Errors
    ///
    /// `NotFound` when the team is absent, deleted, or the caller is not a member.
    pub async fn verify_team_membership(&self, user_id: Uuid, team_id: Uuid) -> CoreResult<Membership> {
        match self.lookup.find_membership(team_id, user_id).await? {
            Some(membership) => Ok(membership),
            None => {
                debug!(user_id = %user_id, team_id = %team_id, "Team membership not resolved");
                Err(CoreError::not_found(TEAM_NOT_FOUND))
            }
        }
    }

    /// Requires OWNER or ADMIN
    pub async fn verify_team_admin(&self, user_id: Uuid, team_id: Uuid) -> CoreResult<Membership> {
        let membership = self.verify_team_membership(user_id, team_id).await?;
        require(
            membership.role.can_manage_members(),
            "Only team owner or admin can perform this action",
        )?;
        Ok(membership)
    }

    /// Requires OWNER
    pub async fn verify_team_owner(&self, user_id: Uuid, team_id: Uuid) -> CoreResult<Membership> {
        let membership = self.verify_team_membership(user_id, team_id).await?;
        require(
            membership.role.can_administer_team(),
            "Only team owner can perform this action",
        )?;
        Ok(membership)
    }

    /// Resolves an active project, then the caller's membership in its team
    pub async fn verify_project_access(&self, user_id: Uuid, project_id: Uuid) -> CoreResult<ProjectAccess> {
        let project = self
            .lookup
            .find_project(project_id)
            .await?
            .ok_or_else(|| CoreError::not_found(PROJECT_NOT_FOUND))?;

        self.project_stage(user_id, project).await
    }

    /// Project access plus project ownership or an OWNER/ADMIN team role
    pub async fn verify_project_edit_permission(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> CoreResult<ProjectAccess> {
        let access = self.verify_project_access(user_id, project_id).await?;

        if !access.can_edit() {
            return Err(CoreError::forbidden(
                "Only project owner or team admin can edit this project",
            ));
        }

        Ok(access)
    }

    /// Resolves an active issue, then project access transitively
    pub async fn verify_issue_access(&self, user_id: Uuid, issue_id: Uuid) -> CoreResult<IssueAccess> {
        let issue = self
            .lookup
            .find_issue(issue_id)
            .await?
            .ok_or_else(|| CoreError::not_found(ISSUE_NOT_FOUND))?;

        // An issue whose project is gone is as invisible as a missing issue
        let project = self
            .lookup
            .find_project(issue.project_id)
            .await?
            .ok_or_else(|| CoreError::not_found(ISSUE_NOT_FOUND))?;

        let ProjectAccess { project, membership } = self.project_stage(user_id, project).await?;

        Ok(IssueAccess {
            issue,
            project,
            membership,
        })
    }

    async fn project_stage(&self, user_id: Uuid, project: Project) -> CoreResult<ProjectAccess> {
        let membership = self
            .lookup
            .find_membership(project.team_id, user_id)
            .await?
            .ok_or_else(|| CoreError::not_found(PROJECT_NOT_FOUND))?;

        Ok(ProjectAccess { project, membership })
    }
}

fn require(allowed: bool, message: &str) -> CoreResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(CoreError::forbidden(message))
    }
}
