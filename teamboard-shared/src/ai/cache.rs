/// Cache of AI output
///
/// Cached text never expires; only a description edit clears it (see
/// [`Issue::set_description`]). [`IssueFieldCache`] keeps the values on the
/// issue row itself with a single `cached_at` timestamp shared by both kinds.
///
/// A cached suggestion is served only while the *summary's* timestamp is set.
/// A suggestion stored on an issue that has never been summarized is therefore
/// regenerated on every call. This coupling is kept as-is.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::store::IssueStore;
use crate::error::StoreResult;
use crate::models::issue::Issue;

/// What the gateway can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistKind {
    Summary,
    Suggestion,
}

impl AssistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistKind::Summary => "summary",
            AssistKind::Suggestion => "suggestion",
        }
    }
}

/// Key-value cache interface used by the gateway
#[async_trait]
pub trait AssistCache: Send + Sync {
    /// Cached text for `issue`, if servable
    async fn lookup(&self, issue: &Issue, kind: AssistKind) -> StoreResult<Option<String>>;

    async fn store(&self, issue_id: Uuid, kind: AssistKind, text: &str) -> StoreResult<()>;
}

/// Cache stored in the issue's AI fields
pub struct IssueFieldCache {
    issues: Arc<dyn IssueStore>,
}

impl IssueFieldCache {
    pub fn new(issues: Arc<dyn IssueStore>) -> Self {
        Self { issues }
    }
}

#[async_trait]
impl AssistCache for IssueFieldCache {
    async fn lookup(&self, issue: &Issue, kind: AssistKind) -> StoreResult<Option<String>> {
        // Both kinds are gated on the summary's timestamp
        if issue.ai.cached_at.is_none() {
            return Ok(None);
        }

        Ok(match kind {
            AssistKind::Summary => issue.ai.summary.clone(),
            AssistKind::Suggestion => issue.ai.suggestion.clone(),
        })
    }

    async fn store(&self, issue_id: Uuid, kind: AssistKind, text: &str) -> StoreResult<()> {
        match kind {
            AssistKind::Summary => self.issues.store_ai_summary(issue_id, text, Utc::now()).await,
            AssistKind::Suggestion => self.issues.store_ai_suggestion(issue_id, text).await,
        }
    }
}
