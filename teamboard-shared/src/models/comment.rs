/// Comment model
///
/// Comments are soft-deletable and editable by their author only.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY,
///     issue_id UUID NOT NULL REFERENCES issues(id),
///     author_id UUID NOT NULL REFERENCES users(id),
///     content TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::Lifecycle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

/// Input for creating or editing a comment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommentInput {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
}

impl Comment {
    pub fn new(issue_id: Uuid, author_id: Uuid, content: String) -> Self {
        let now = Utc::now();
        Comment {
            id: Uuid::new_v4(),
            issue_id,
            author_id,
            content,
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
        }
    }
}

/// Comment joined with its author's display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: Option<String>,
}
