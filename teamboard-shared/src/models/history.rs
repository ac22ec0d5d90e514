/// Issue history (audit trail) model
///
/// History rows are immutable and append-only. Each row captures one field-level
/// change: the field, its old and new rendered value, the actor and the instant.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE history_field AS ENUM ('title', 'assignee', 'status', 'priority');
///
/// CREATE TABLE issue_history (
///     id UUID PRIMARY KEY,
///     issue_id UUID NOT NULL REFERENCES issues(id),
///     actor_id UUID NOT NULL REFERENCES users(id),
///     field history_field NOT NULL,
///     old_value TEXT,
///     new_value TEXT,
///     changed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Audited issue fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "history_field", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HistoryField {
    Title,
    Assignee,
    Status,
    Priority,
}

impl HistoryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryField::Title => "title",
            HistoryField::Assignee => "assignee",
            HistoryField::Status => "status",
            HistoryField::Priority => "priority",
        }
    }
}

impl fmt::Display for HistoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IssueHistory {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub actor_id: Uuid,
    pub field: HistoryField,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl IssueHistory {
    pub fn record(
        issue_id: Uuid,
        actor_id: Uuid,
        field: HistoryField,
        old_value: Option<String>,
        new_value: Option<String>,
        changed_at: DateTime<Utc>,
    ) -> Self {
        IssueHistory {
            id: Uuid::new_v4(),
            issue_id,
            actor_id,
            field,
            old_value,
            new_value,
            changed_at,
        }
    }
}
