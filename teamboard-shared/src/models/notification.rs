/// Notification model
///
/// Notifications are created once, never deleted, and only ever mutated through
/// their read flag.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id),
///     title VARCHAR(200) NOT NULL,
///     content TEXT NOT NULL,
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     issue_id UUID REFERENCES issues(id),
///     team_id UUID REFERENCES teams(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    pub title: String,
    pub content: String,
    pub is_read: bool,

    /// Related issue, if any
    pub issue_id: Option<Uuid>,

    /// Related team, if any
    pub team_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        title: impl Into<String>,
        content: impl Into<String>,
        issue_id: Option<Uuid>,
        team_id: Option<Uuid>,
    ) -> Self {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            content: content.into(),
            is_read: false,
            issue_id,
            team_id,
            created_at: Utc::now(),
        }
    }
}
