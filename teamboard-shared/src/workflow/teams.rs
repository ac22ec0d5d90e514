/// Team management: teams, invites and memberships
///
/// Memberships come from exactly two places: the OWNER membership written with
/// the team, and MEMBER memberships written when an invite is accepted. Roles
/// change only through [`TeamService::change_member_role`], which never hands out
/// OWNER.
///
/// # Invite flow
///
/// ```text
/// invite_member ──► PENDING ──accept_invite──► ACCEPTED (+ MEMBER membership)
///                      │
///                      └── accepted after 7 days ──► EXPIRED
/// ```
///
/// The plaintext token is returned once and mailed; only its hash is stored.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::AccessResolver;
use crate::auth::invite_token::{generate_invite_token, hash_invite_token, is_well_formed};
use crate::db::store::Store;
use crate::error::{CoreError, CoreResult, StoreError};
use crate::models::membership::{MemberView, Membership, TeamRole};
use crate::models::team::{InviteInput, InviteStatus, Team, TeamDetail, TeamInput, TeamInvite};
use crate::models::user::normalize_email;
use crate::notify::events::{EventSink, WorkflowEvent};
use crate::notify::mailer::Mailer;

const INVITE_NOT_FOUND: &str = "Invite not found";

/// A freshly issued invite and its plaintext token
///
/// The token is not recoverable later.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedInvite {
    pub invite: TeamInvite,
    pub token: String,
}

#[derive(Clone)]
pub struct TeamService {
    store: Arc<dyn Store>,
    access: AccessResolver,
    events: EventSink,
    mailer: Arc<dyn Mailer>,
}

impl TeamService {
    pub fn new(
        store: Arc<dyn Store>,
        access: AccessResolver,
        events: EventSink,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            access,
            events,
            mailer,
        }
    }

    /// Creates a team owned by `actor_id`
    pub async fn create_team(&self, actor_id: Uuid, input: TeamInput) -> CoreResult<Team> {
        input.validate()?;

        let team = Team::new(input.name, actor_id);
        let owner = Membership::new(team.id, actor_id, TeamRole::Owner);
        self.store.create_team(&team, &owner).await?;

        info!(team_id = %team.id, user_id = %actor_id, "Team created");
        Ok(team)
    }

    /// Active teams the caller belongs to
    pub async fn list_my_teams(&self, actor_id: Uuid) -> CoreResult<Vec<Team>> {
        Ok(self.store.list_teams_for_user(actor_id).await?)
    }

    /// Renames a team (OWNER or ADMIN)
    /// Team and its members, for members only
    pub async fn get_team(&self, actor_id: Uuid, team_id: Uuid) -> CoreResult<TeamDetail> {
        self.access.verify_team_membership(actor_id, team_id).await?;

        let team = self.active_team(team_id).await?;
        let members = self.store.list_members(team_id).await?;
        Ok(TeamDetail { team, members })
    }

    pub async fn update_team(&self, actor_id: Uuid, team_id: Uuid, input: TeamInput) -> CoreResult<Team> {
        input.validate()?;
        self.access.verify_team_admin(actor_id, team_id).await?;

        let mut team = self.active_team(team_id).await?;
        team.name = input.name;
        team.updated_at = Utc::now();
        self.store.save_team(&team).await?;

        info!(team_id = %team_id, user_id = %actor_id, "Team updated");
        Ok(team)
    }

    /// Soft-deletes a team (OWNER only)
    pub async fn delete_team(&self, actor_id: Uuid, team_id: Uuid) -> CoreResult<()> {
        self.access.verify_team_owner(actor_id, team_id).await?;

        let mut team = self.active_team(team_id).await?;
        let now = Utc::now();
        team.lifecycle = team.lifecycle.delete(now);
        team.updated_at = now;
        self.store.save_team(&team).await?;

        info!(team_id = %team_id, user_id = %actor_id, "Team deleted");
        Ok(())
    }

    /// Invites an email address into the team (OWNER or ADMIN)
    ///
    /// Mail delivery is best effort: a failure is logged and the invite stands.
    pub async fn invite_member(
        &self,
        actor_id: Uuid,
        team_id: Uuid,
        input: InviteInput,
    ) -> CoreResult<IssuedInvite> {
        input.validate()?;
        self.access.verify_team_admin(actor_id, team_id).await?;
        let team = self.active_team(team_id).await?;

        let email = normalize_email(&input.email);
        if let Some(user) = self.store.find_user_by_email(&email).await? {
            if self.store.find_membership(team_id, user.id).await?.is_some() {
                return Err(CoreError::validation("User is already a member of this team"));
            }
        }

        let (token, token_hash) = generate_invite_token();
        let invite = TeamInvite::pending(team_id, &email, token_hash, actor_id);
        self.store.insert_invite(&invite).await?;

        info!(
            team_id = %team_id,
            invite_id = %invite.id,
            user_id = %actor_id,
            "Team invite created"
        );

        let inviter_name = self
            .store
            .find_user(actor_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| "A teammate".to_string());

        if let Err(e) = self
            .mailer
            .send_invite(&invite.email, &team.name, &inviter_name, &token)
            .await
        {
            warn!(invite_id = %invite.id, error = %e, "Failed to send invite email");
        }

        Ok(IssuedInvite { invite, token })
    }

    /// Accepts an invite on behalf of `actor_id`
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown token or a team that no longer exists
    /// - `Validation` when the invite expired, was already used, or was sent to
    ///   another email address
    pub async fn accept_invite(&self, actor_id: Uuid, token: &str) -> CoreResult<Membership> {
        if !is_well_formed(token) {
            return Err(CoreError::not_found(INVITE_NOT_FOUND));
        }

        let mut invite = self
            .store
            .find_invite_by_token_hash(&hash_invite_token(token))
            .await?
            .ok_or_else(|| CoreError::not_found(INVITE_NOT_FOUND))?;

        if invite.status != InviteStatus::Pending {
            return Err(CoreError::validation(format!(
                "Invite is {}",
                invite.status.as_str().to_lowercase()
            )));
        }

        let now = Utc::now();
        if invite.is_expired_at(now) {
            invite.status = InviteStatus::Expired;
            self.store.save_invite(&invite).await?;
            info!(invite_id = %invite.id, "Invite expired");
            return Err(CoreError::validation("Invite has expired"));
        }

        let user = self
            .store
            .find_user(actor_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User not found"))?;
        if normalize_email(&user.email) != invite.email {
            return Err(CoreError::validation("This invite was sent to a different email address"));
        }

        let team = self
            .store
            .find_team(invite.team_id)
            .await?
            .ok_or_else(|| CoreError::not_found(INVITE_NOT_FOUND))?;

        invite.accepted_at = Some(now);
        let membership = Membership::new(team.id, actor_id, TeamRole::Member);
        match self.store.accept_invite(&invite, &membership).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(CoreError::validation("You are already a member of this team"))
            }
            Err(e) => return Err(e.into()),
        }

        info!(team_id = %team.id, user_id = %actor_id, invite_id = %invite.id, "Invite accepted");

        self.events.emit(WorkflowEvent::MemberJoined {
            team_id: team.id,
            team_name: team.name,
            owner_id: team.owner_id,
            member_id: actor_id,
            member_name: user.name,
        });

        Ok(membership)
    }

    /// Changes a member's role (OWNER only)
    ///
    /// OWNER cannot be assigned and the owner cannot change their own role.
    pub async fn change_member_role(
        &self,
        actor_id: Uuid,
        team_id: Uuid,
        target_id: Uuid,
        role: TeamRole,
    ) -> CoreResult<()> {
        self.access.verify_team_owner(actor_id, team_id).await?;

        if role == TeamRole::Owner {
            return Err(CoreError::validation("Ownership transfer is not supported"));
        }
        if target_id == actor_id {
            return Err(CoreError::validation("You cannot change your own role"));
        }

        if !self.store.update_member_role(team_id, target_id, role).await? {
            return Err(CoreError::not_found("Member not found"));
        }

        info!(
            team_id = %team_id,
            user_id = %actor_id,
            target_id = %target_id,
            role = role.as_str(),
            "Member role changed"
        );
        Ok(())
    }

    /// Removes another member from the team
    ///
    /// Owners may remove anyone but themselves; admins only plain members.
    pub async fn kick_member(&self, actor_id: Uuid, team_id: Uuid, target_id: Uuid) -> CoreResult<()> {
        let actor = self.access.verify_team_membership(actor_id, team_id).await?;

        if target_id == actor_id {
            return Err(CoreError::validation("Use leave to remove yourself from a team"));
        }

        let target = self
            .store
            .find_membership(team_id, target_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Member not found"))?;

        if !actor.role.can_kick(&target.role) {
            return Err(CoreError::forbidden(format!(
                "{} cannot remove a member with role {}",
                actor.role, target.role
            )));
        }

        self.store.delete_membership(team_id, target_id).await?;
        info!(team_id = %team_id, user_id = %actor_id, target_id = %target_id, "Member removed");
        Ok(())
    }

    /// Leaves the team. The owner cannot leave.
    pub async fn leave_team(&self, actor_id: Uuid, team_id: Uuid) -> CoreResult<()> {
        let membership = self.access.verify_team_membership(actor_id, team_id).await?;

        if membership.role == TeamRole::Owner {
            return Err(CoreError::forbidden(
                "Team owner cannot leave; delete the team instead",
            ));
        }

        self.store.delete_membership(team_id, actor_id).await?;
        info!(team_id = %team_id, user_id = %actor_id, "Member left team");
        Ok(())
    }

    pub async fn list_members(&self, actor_id: Uuid, team_id: Uuid) -> CoreResult<Vec<MemberView>> {
        self.access.verify_team_membership(actor_id, team_id).await?;
        Ok(self.store.list_members(team_id).await?)
    }

    async fn active_team(&self, team_id: Uuid) -> CoreResult<Team> {
        self.store
            .find_team(team_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Team not found or you are not a member"))
    }
}
