/// Team and invite models
///
/// A team is owned by one user and groups memberships and projects. Invites bring
/// external users into a team: an admin invites an email address, the invite stays
/// `PENDING` for seven days, and acceptance creates a `MEMBER` membership.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY,
///     name VARCHAR(50) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
///
/// CREATE TYPE invite_status AS ENUM ('PENDING', 'ACCEPTED', 'EXPIRED');
///
/// CREATE TABLE team_invites (
///     id UUID PRIMARY KEY,
///     team_id UUID NOT NULL REFERENCES teams(id),
///     email VARCHAR(255) NOT NULL,
///     status invite_status NOT NULL DEFAULT 'PENDING',
///     token_hash CHAR(64) NOT NULL UNIQUE,
///     invited_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL,
///     accepted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::Lifecycle;
use super::membership::MemberView;
use super::user::normalize_email;

/// How long an invite stays acceptable
pub const INVITE_TTL_DAYS: i64 = 7;

/// Team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

/// Team with its member roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<MemberView>,
}

/// Input for creating or renaming a team
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TeamInput {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

impl Team {
    pub fn new(name: String, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Team {
            id: Uuid::new_v4(),
            name,
            owner_id,
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
        }
    }
}

/// Invite state machine: `PENDING → ACCEPTED` or `PENDING → EXPIRED`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invite_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "PENDING",
            InviteStatus::Accepted => "ACCEPTED",
            InviteStatus::Expired => "EXPIRED",
        }
    }
}

/// Team invite. Only the SHA-256 hash of the token is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamInvite {
    pub id: Uuid,
    pub team_id: Uuid,
    pub email: String,
    pub status: InviteStatus,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Input for inviting a user by email
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InviteInput {
    #[validate(email)]
    pub email: String,
}

impl TeamInvite {
    /// Builds a pending invite expiring [`INVITE_TTL_DAYS`] from now
    pub fn pending(team_id: Uuid, email: &str, token_hash: String, invited_by: Uuid) -> Self {
        let now = Utc::now();
        TeamInvite {
            id: Uuid::new_v4(),
            team_id,
            email: normalize_email(email),
            status: InviteStatus::Pending,
            token_hash,
            invited_by,
            created_at: now,
            expires_at: now + Duration::days(INVITE_TTL_DAYS),
            accepted_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
