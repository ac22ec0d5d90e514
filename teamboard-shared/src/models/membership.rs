/// Team membership model and role hierarchy
///
/// A membership is the `(team, user, role)` record granting a user access to a
/// team's projects and issues. It is unique per `(team, user)`; the team creator
/// receives the `OWNER` membership exactly once, at team creation. Every other
/// membership comes from invite acceptance.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE team_role AS ENUM ('OWNER', 'ADMIN', 'MEMBER');
///
/// CREATE TABLE team_members (
///     team_id UUID NOT NULL REFERENCES teams(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role team_role NOT NULL DEFAULT 'MEMBER',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **OWNER**: everything, including role changes and team deletion
/// - **ADMIN**: invite members, kick plain members, edit any project
/// - **MEMBER**: work on issues in the team's projects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Team roles, totally ordered `Owner > Admin > Member`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TeamRole {
    /// Created the team; full control
    Owner,

    /// Manages members and projects
    Admin,

    /// Works on issues
    Member,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Owner => "OWNER",
            TeamRole::Admin => "ADMIN",
            TeamRole::Member => "MEMBER",
        }
    }

    /// Checks if this role is at least as strong as `required`
    ///
    /// Hierarchy: Owner > Admin > Member
    pub fn has_permission(&self, required: &TeamRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    /// Can invite users and kick plain members
    pub fn can_manage_members(&self) -> bool {
        self.has_permission(&TeamRole::Admin)
    }

    /// Can edit any project of the team, not just owned ones
    pub fn can_edit_any_project(&self) -> bool {
        self.has_permission(&TeamRole::Admin)
    }

    /// Can change roles and delete the team
    pub fn can_administer_team(&self) -> bool {
        self.has_permission(&TeamRole::Owner)
    }

    /// Checks whether this role may remove a member holding `target`
    ///
    /// Owners remove anyone; admins remove only plain members.
    pub fn can_kick(&self, target: &TeamRole) -> bool {
        match self {
            TeamRole::Owner => true,
            TeamRole::Admin => *target == TeamRole::Member,
            TeamRole::Member => false,
        }
    }

    fn permission_level(&self) -> u8 {
        match self {
            TeamRole::Owner => 3,
            TeamRole::Admin => 2,
            TeamRole::Member => 1,
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OWNER" => Ok(TeamRole::Owner),
            "ADMIN" => Ok(TeamRole::Admin),
            "MEMBER" => Ok(TeamRole::Member),
            other => Err(format!("unknown team role: {}", other)),
        }
    }
}

/// Membership record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Builds a new membership joined now
    pub fn new(team_id: Uuid, user_id: Uuid, role: TeamRole) -> Self {
        Membership {
            team_id,
            user_id,
            role,
            joined_at: Utc::now(),
        }
    }
}

/// Membership joined with the member's profile, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberView {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}
