/// Notification fan-out and inbox operations
///
/// The dispatcher turns [`WorkflowEvent`]s into notification rows and serves the
/// recipient's inbox. Recipient selection is pure ([`plan`]) and independent of
/// storage.
///
/// # Recipient rules
///
/// - **Issue created**: the assignee, if set and not the creator.
/// - **Comment created**: the issue creator unless they wrote the comment, plus
///   the assignee unless they wrote it or are also the creator. At most two
///   notifications, never the same recipient twice, never the commenter.
/// - **Member joined**: the team owner.
///
/// Delivery failures are logged and dropped; they never reach the mutation that
/// produced the event.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{EventReceiver, WorkflowEvent};
use crate::db::store::NotificationStore;
use crate::error::{CoreError, CoreResult};
use crate::models::notification::Notification;

/// A notification about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: Uuid,
    pub title: String,
    pub content: String,
    pub issue_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

/// Computes the notifications an event produces
pub fn plan(event: &WorkflowEvent) -> Vec<Delivery> {
    match event {
        WorkflowEvent::IssueCreated {
            issue_id,
            title,
            creator_id,
            assignee_id,
        } => match assignee_id {
            Some(assignee) if assignee != creator_id => vec![Delivery {
                recipient: *assignee,
                title: "New issue assigned".to_string(),
                content: format!("You've been assigned to: {}", title),
                issue_id: Some(*issue_id),
                team_id: None,
            }],
            _ => Vec::new(),
        },

        WorkflowEvent::CommentCreated {
            issue_id,
            issue_title,
            commenter_id,
            commenter_name,
            creator_id,
            assignee_id,
            ..
        } => {
            let mut deliveries = Vec::with_capacity(2);
            let content = format!("{} commented on: {}", commenter_name, issue_title);

            if creator_id != commenter_id {
                deliveries.push(Delivery {
                    recipient: *creator_id,
                    title: "New comment on your issue".to_string(),
                    content: content.clone(),
                    issue_id: Some(*issue_id),
                    team_id: None,
                });
            }

            if let Some(assignee) = assignee_id {
                if assignee != commenter_id && assignee != creator_id {
                    deliveries.push(Delivery {
                        recipient: *assignee,
                        title: "New comment on assigned issue".to_string(),
                        content,
                        issue_id: Some(*issue_id),
                        team_id: None,
                    });
                }
            }

            deliveries
        }

        WorkflowEvent::MemberJoined {
            team_id,
            team_name,
            owner_id,
            member_id,
            member_name,
        } => {
            if owner_id == member_id {
                return Vec::new();
            }
            vec![Delivery {
                recipient: *owner_id,
                title: "New team member".to_string(),
                content: format!("{} joined {}", member_name, team_name),
                issue_id: None,
                team_id: Some(*team_id),
            }]
        }
    }
}

/// Writes notifications and serves inboxes
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Creates one notification for `recipient`
    ///
    /// # Errors
    ///
    /// `Service` when the notification could not be written.
    pub async fn notify(
        &self,
        recipient: Uuid,
        title: &str,
        content: &str,
        issue_id: Option<Uuid>,
        team_id: Option<Uuid>,
    ) -> CoreResult<Notification> {
        let notification = Notification::new(recipient, title, content, issue_id, team_id);

        self.store
            .insert_notification(&notification)
            .await
            .map_err(|e| CoreError::service(format!("Notification delivery failed: {}", e)))?;

        debug!(
            notification_id = %notification.id,
            user_id = %recipient,
            "Notification stored"
        );
        Ok(notification)
    }

    /// Delivers everything an event produces. Failures are logged, never returned.
    ///
    /// Returns the number of notifications written.
    pub async fn dispatch(&self, event: &WorkflowEvent) -> usize {
        let mut delivered = 0;

        for delivery in plan(event) {
            match self
                .notify(
                    delivery.recipient,
                    &delivery.title,
                    &delivery.content,
                    delivery.issue_id,
                    delivery.team_id,
                )
                .await
            {
                Ok(_) => delivered += 1,
                Err(e) => warn!(
                    event = event.kind(),
                    user_id = %delivery.recipient,
                    error = %e,
                    "Dropping notification after delivery failure"
                ),
            }
        }

        delivered
    }

    /// Consumes events until every sender is dropped
    pub async fn run_until_closed(&self, mut events: EventReceiver) {
        info!("Notification dispatcher started");
        while let Some(event) = events.recv().await {
            self.dispatch(&event).await;
        }
        info!("Notification dispatcher stopped: event channel closed");
    }

    /// Dispatches whatever is already queued without waiting for more
    ///
    /// Returns the number of events processed.
    pub async fn drain_pending(&self, events: &mut EventReceiver) -> usize {
        let mut processed = 0;
        while let Ok(event) = events.try_recv() {
            self.dispatch(&event).await;
            processed += 1;
        }
        processed
    }

    /// The user's notifications, newest first
    pub async fn list(&self, user_id: Uuid, unread_only: bool) -> CoreResult<Vec<Notification>> {
        Ok(self.store.list_notifications(user_id, unread_only).await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> CoreResult<i64> {
        Ok(self.store.count_unread(user_id).await?)
    }

    /// # Errors
    ///
    /// `NotFound` when the notification does not exist or belongs to another user.
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> CoreResult<()> {
        if self.store.mark_read(user_id, notification_id).await? {
            Ok(())
        } else {
            Err(CoreError::not_found("Notification not found"))
        }
    }

    /// Returns how many notifications were flipped to read
    pub async fn mark_all_read(&self, user_id: Uuid) -> CoreResult<u64> {
        let flipped = self.store.mark_all_read(user_id).await?;
        if flipped > 0 {
            debug!(user_id = %user_id, count = flipped, "Marked notifications read");
        }
        Ok(flipped)
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::error::{ErrorKind, StoreError, StoreResult};
    use crate::notify::events::EventSink;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl NotificationStore for BrokenStore {
        async fn insert_notification(&self, _: &Notification) -> StoreResult<()> {
            Err(StoreError::Unavailable("inbox offline".into()))
        }
        async fn list_notifications(&self, _: Uuid, _: bool) -> StoreResult<Vec<Notification>> {
            Ok(Vec::new())
        }
        async fn count_unread(&self, _: Uuid) -> StoreResult<i64> {
            Ok(0)
        }
        async fn mark_read(&self, _: Uuid, _: Uuid) -> StoreResult<bool> {
            Ok(false)
        }
        async fn mark_all_read(&self, _: Uuid) -> StoreResult<u64> {
            Ok(0)
        }
    }

    fn comment_event(creator: Uuid, assignee: Option<Uuid>, commenter: Uuid) -> WorkflowEvent {
        WorkflowEvent::CommentCreated {
            issue_id: Uuid::new_v4(),
            issue_title: "Checkout hangs".into(),
            comment_id: Uuid::new_v4(),
            commenter_id: commenter,
            commenter_name: "Carol".into(),
            creator_id: creator,
            assignee_id: assignee,
        }
    }

    #[test]
    fn test_plan_issue_created() {
        let creator = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let event = |assignee_id| WorkflowEvent::IssueCreated {
            issue_id: Uuid::new_v4(),
            title: "Checkout hangs".into(),
            creator_id: creator,
            assignee_id,
        };

        let deliveries = plan(&event(Some(assignee)));
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].recipient, assignee);
        assert_eq!(deliveries[0].content, "You've been assigned to: Checkout hangs");

        assert!(plan(&event(Some(creator))).is_empty());
        assert!(plan(&event(None)).is_empty());
    }

    #[test]
    fn test_plan_comment_distinct_parties() {
        let (creator, assignee, commenter) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let deliveries = plan(&comment_event(creator, Some(assignee), commenter));
        let recipients: Vec<Uuid> = deliveries.iter().map(|d| d.recipient).collect();
        assert_eq!(recipients, vec![creator, assignee]);
        assert!(!recipients.contains(&commenter));
    }

    #[test]
    fn test_plan_comment_overlapping_parties() {
        let (creator, other) = (Uuid::new_v4(), Uuid::new_v4());

        // Creator comments on their own issue assigned to someone else
        let deliveries = plan(&comment_event(creator, Some(other), creator));
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].recipient, other);

        // Creator is also the assignee
        let deliveries = plan(&comment_event(creator, Some(creator), other));
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].recipient, creator);

        // Assignee comments
        let deliveries = plan(&comment_event(creator, Some(other), other));
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].recipient, creator);
    }

    #[test]
    fn test_plan_member_joined() {
        let owner = Uuid::new_v4();
        let deliveries = plan(&WorkflowEvent::MemberJoined {
            team_id: Uuid::new_v4(),
            team_name: "Platform".into(),
            owner_id: owner,
            member_id: Uuid::new_v4(),
            member_name: "Bob".into(),
        });
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].recipient, owner);
        assert!(deliveries[0].team_id.is_some());
    }

    #[tokio::test]
    async fn test_notify_failure_is_service_error() {
        let dispatcher = NotificationDispatcher::new(Arc::new(BrokenStore));
        let err = dispatcher
            .notify(Uuid::new_v4(), "t", "c", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let dispatcher = NotificationDispatcher::new(Arc::new(BrokenStore));
        let event = comment_event(Uuid::new_v4(), Some(Uuid::new_v4()), Uuid::new_v4());
        assert_eq!(dispatcher.dispatch(&event).await, 0);
    }

    #[tokio::test]
    async fn test_drain_and_inbox() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = NotificationDispatcher::new(store);
        let (sink, mut rx) = EventSink::channel();

        let (creator, assignee, commenter) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        sink.emit(comment_event(creator, Some(assignee), commenter));
        sink.emit(comment_event(creator, None, commenter));

        assert_eq!(dispatcher.drain_pending(&mut rx).await, 2);
        assert_eq!(dispatcher.unread_count(creator).await.unwrap(), 2);
        assert_eq!(dispatcher.unread_count(assignee).await.unwrap(), 1);
        assert_eq!(dispatcher.unread_count(commenter).await.unwrap(), 0);

        let inbox = dispatcher.list(creator, true).await.unwrap();
        dispatcher.mark_read(creator, inbox[0].id).await.unwrap();
        assert_eq!(dispatcher.unread_count(creator).await.unwrap(), 1);

        let err = dispatcher.mark_read(assignee, inbox[1].id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(dispatcher.mark_all_read(creator).await.unwrap(), 1);
        assert_eq!(dispatcher.list(creator, true).await.unwrap().len(), 0);
        assert_eq!(dispatcher.list(creator, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_until_closed_stops_when_senders_drop() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = NotificationDispatcher::new(store);
        let (sink, rx) = EventSink::channel();

        let creator = Uuid::new_v4();
        sink.emit(comment_event(creator, None, Uuid::new_v4()));
        drop(sink);

        dispatcher.run_until_closed(rx).await;
        assert_eq!(dispatcher.unread_count(creator).await.unwrap(), 1);
    }
}
