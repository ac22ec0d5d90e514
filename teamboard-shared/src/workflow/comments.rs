/// Issue comments
///
/// Anyone with issue access may comment. Only the author may edit or delete a
/// comment. A new comment emits [`WorkflowEvent::CommentCreated`] after it has
/// been stored.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::AccessResolver;
use crate::db::store::Store;
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::models::comment::{Comment, CommentInput, CommentView};
use crate::notify::events::{EventSink, WorkflowEvent};

const COMMENT_NOT_FOUND: &str = "Comment not found";

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn Store>,
    access: AccessResolver,
    events: EventSink,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>, access: AccessResolver, events: EventSink) -> Self {
        Self {
            store,
            access,
            events,
        }
    }

    pub async fn create_comment(
        &self,
        actor_id: Uuid,
        issue_id: Uuid,
        input: CommentInput,
    ) -> CoreResult<CommentView> {
        input.validate()?;
        let issue = self.access.verify_issue_access(actor_id, issue_id).await?.issue;
        let author_name = self.store.find_user(actor_id).await?.map(|u| u.name);

        let comment = Comment::new(issue_id, actor_id, input.content);
        self.store.insert_comment(&comment).await?;

        info!(comment_id = %comment.id, issue_id = %issue_id, user_id = %actor_id, "Comment created");

        self.events.emit(WorkflowEvent::CommentCreated {
            issue_id,
            issue_title: issue.title,
            comment_id: comment.id,
            commenter_id: actor_id,
            commenter_name: author_name.clone().unwrap_or_else(|| "Someone".to_string()),
            creator_id: issue.creator_id,
            assignee_id: issue.assignee_id,
        });

        Ok(CommentView {
            comment,
            author_name,
        })
    }

    /// Active comments on an issue, oldest first
    pub async fn list_comments(&self, actor_id: Uuid, issue_id: Uuid) -> CoreResult<Vec<CommentView>> {
        self.access.verify_issue_access(actor_id, issue_id).await?;

        let comments = self.store.list_comments(issue_id).await?;
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let author_name = self.store.find_user(comment.author_id).await?.map(|u| u.name);
            views.push(CommentView {
                comment,
                author_name,
            });
        }
        Ok(views)
    }

    pub async fn update_comment(
        &self,
        actor_id: Uuid,
        comment_id: Uuid,
        input: CommentInput,
    ) -> CoreResult<Comment> {
        input.validate()?;
        let mut comment = self.authored_comment(actor_id, comment_id).await?;

        comment.content = input.content;
        comment.updated_at = Utc::now();
        self.store.save_comment(&comment).await?;

        debug!(comment_id = %comment_id, user_id = %actor_id, "Comment updated");
        Ok(comment)
    }

    pub async fn delete_comment(&self, actor_id: Uuid, comment_id: Uuid) -> CoreResult<()> {
        let mut comment = self.authored_comment(actor_id, comment_id).await?;

        let now = Utc::now();
        comment.lifecycle = comment.lifecycle.delete(now);
        comment.updated_at = now;
        self.store.save_comment(&comment).await?;

        info!(comment_id = %comment_id, user_id = %actor_id, "Comment deleted");
        Ok(())
    }

    /// Resolves an active comment the caller can see and wrote
    async fn authored_comment(&self, actor_id: Uuid, comment_id: Uuid) -> CoreResult<Comment> {
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| CoreError::not_found(COMMENT_NOT_FOUND))?;

        self.access
            .verify_issue_access(actor_id, comment.issue_id)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => CoreError::not_found(COMMENT_NOT_FOUND),
                _ => e,
            })?;

        if comment.author_id != actor_id {
            return Err(CoreError::forbidden("Only the author can modify this comment"));
        }
        Ok(comment)
    }
}
