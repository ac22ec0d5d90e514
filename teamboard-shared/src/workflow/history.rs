/// Field-level audit diffing
///
/// Compares the audited fields of an issue before and after an update and
/// produces one [`IssueHistory`] row per field whose value actually changed.
/// Description, due date and position are not audited.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::history::{HistoryField, IssueHistory};
use crate::models::issue::Issue;

/// Builds the history rows for `before → after`, in a fixed field order
pub fn diff(before: &Issue, after: &Issue, actor_id: Uuid, at: DateTime<Utc>) -> Vec<IssueHistory> {
    let mut rows = Vec::new();
    let mut push = |field: HistoryField, old: Option<String>, new: Option<String>| {
        if old != new {
            rows.push(IssueHistory::record(after.id, actor_id, field, old, new, at));
        }
    };

    push(
        HistoryField::Title,
        Some(before.title.clone()),
        Some(after.title.clone()),
    );
    push(
        HistoryField::Assignee,
        before.assignee_id.map(|id| id.to_string()),
        after.assignee_id.map(|id| id.to_string()),
    );
    push(
        HistoryField::Status,
        Some(before.status.clone()),
        Some(after.status.clone()),
    );
    push(
        HistoryField::Priority,
        Some(before.priority.to_string()),
        Some(after.priority.to_string()),
    );

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::{CreateIssue, IssuePriority};

    fn issue() -> Issue {
        Issue::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Backlog".into(),
            &CreateIssue {
                title: "Export fails".into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_no_change_no_rows() {
        let before = issue();
        let mut after = before.clone();
        after.description = Some("new text".into());
        after.position = 7;

        assert!(diff(&before, &after, Uuid::new_v4(), Utc::now()).is_empty());
    }

    #[test]
    fn test_each_changed_field_produces_one_row() {
        let before = issue();
        let assignee = Uuid::new_v4();
        let mut after = before.clone();
        after.title = "Export fails on large files".into();
        after.assignee_id = Some(assignee);
        after.status = "In Progress".into();
        after.priority = IssuePriority::High;

        let actor = Uuid::new_v4();
        let rows = diff(&before, &after, actor, Utc::now());
        assert_eq!(rows.len(), 4);

        let fields: Vec<HistoryField> = rows.iter().map(|r| r.field).collect();
        assert_eq!(
            fields,
            vec![
                HistoryField::Title,
                HistoryField::Assignee,
                HistoryField::Status,
                HistoryField::Priority
            ]
        );

        assert_eq!(rows[1].old_value, None);
        assert_eq!(rows[1].new_value, Some(assignee.to_string()));
        assert_eq!(rows[3].old_value.as_deref(), Some("MEDIUM"));
        assert_eq!(rows[3].new_value.as_deref(), Some("HIGH"));
        assert!(rows.iter().all(|r| r.actor_id == actor && r.issue_id == before.id));
    }

    #[test]
    fn test_unassign_is_recorded() {
        let mut before = issue();
        let assignee = Uuid::new_v4();
        before.assignee_id = Some(assignee);
        let mut after = before.clone();
        after.assignee_id = None;

        let rows = diff(&before, &after, Uuid::new_v4(), Utc::now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field, HistoryField::Assignee);
        assert_eq!(rows[0].old_value, Some(assignee.to_string()));
        assert_eq!(rows[0].new_value, None);
    }
}
