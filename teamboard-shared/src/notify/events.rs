/// Workflow events consumed by the notification dispatcher
///
/// The workflow emits an event after a mutation has been durably applied and
/// returns without waiting for delivery:
///
/// ```text
/// WorkflowEngine ──emit──► unbounded channel ──► NotificationDispatcher ──► store
/// ```
///
/// Between the commit and the dispatcher picking the event up, the mutation is
/// visible while its notification is not. A failed delivery never undoes the
/// mutation.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Something notification-worthy that already happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    IssueCreated {
        issue_id: Uuid,
        title: String,
        creator_id: Uuid,
        assignee_id: Option<Uuid>,
    },

    CommentCreated {
        issue_id: Uuid,
        issue_title: String,
        comment_id: Uuid,
        commenter_id: Uuid,
        commenter_name: String,
        creator_id: Uuid,
        assignee_id: Option<Uuid>,
    },

    MemberJoined {
        team_id: Uuid,
        team_name: String,
        owner_id: Uuid,
        member_id: Uuid,
        member_name: String,
    },
}

impl WorkflowEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowEvent::IssueCreated { .. } => "issue_created",
            WorkflowEvent::CommentCreated { .. } => "comment_created",
            WorkflowEvent::MemberJoined { .. } => "member_joined",
        }
    }
}

/// Receiving half handed to the dispatcher loop
pub type EventReceiver = mpsc::UnboundedReceiver<WorkflowEvent>;

/// Sending half held by workflow services
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<WorkflowEvent>,
}

impl EventSink {
    /// Creates a connected sink/receiver pair
    pub fn channel() -> (EventSink, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink { tx }, rx)
    }

    /// Queues an event. Never blocks and never fails the caller.
    pub fn emit(&self, event: WorkflowEvent) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            warn!(event = kind, "Notification dispatcher is gone; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let (sink, mut rx) = EventSink::channel();
        let event = WorkflowEvent::IssueCreated {
            issue_id: Uuid::new_v4(),
            title: "Fix login".into(),
            creator_id: Uuid::new_v4(),
            assignee_id: None,
        };

        sink.emit(event.clone());
        assert_eq!(rx.recv().await, Some(event));
    }

    #[test]
    fn test_emit_after_receiver_dropped_does_not_panic() {
        let (sink, rx) = EventSink::channel();
        drop(rx);

        sink.emit(WorkflowEvent::MemberJoined {
            team_id: Uuid::new_v4(),
            team_name: "Platform".into(),
            owner_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            member_name: "Bob".into(),
        });
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = WorkflowEvent::IssueCreated {
            issue_id: Uuid::nil(),
            title: "t".into(),
            creator_id: Uuid::nil(),
            assignee_id: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "issue_created");
    }
}
