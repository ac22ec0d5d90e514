/// AI assist gateway
///
/// Gates and caches summary/suggestion calls for one issue. Each call runs the
/// same pipeline and stops at the first failing stage:
///
/// 1. issue access (`NotFound`)
/// 2. description longer than ten characters (`Validation`)
/// 3. per-user limiter (`RateLimited`)
/// 4. cache lookup (hit returns immediately)
/// 5. provider call bounded by a timeout (`Service` on failure or expiry)
/// 6. cache store
///
/// Provider failures are returned on the first occurrence; nothing is retried.
/// A cache hit still consumes one limiter slot.

use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cache::{AssistCache, AssistKind};
use super::provider::AiProvider;
use super::rate_limit::CallLimiter;
use crate::auth::authorization::AccessResolver;
use crate::error::{CoreError, CoreResult};

/// Descriptions must be longer than this many characters
pub const AI_MIN_DESCRIPTION_CHARS: usize = 10;

/// Default upper bound on a single provider call
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Text returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistOutput {
    pub text: String,
    /// Served from cache without a provider call
    pub cached: bool,
}

pub struct AiAssistGateway {
    access: AccessResolver,
    limiter: Arc<dyn CallLimiter>,
    cache: Arc<dyn AssistCache>,
    provider: Arc<dyn AiProvider>,
    timeout: Duration,
}

impl AiAssistGateway {
    pub fn new(
        access: AccessResolver,
        limiter: Arc<dyn CallLimiter>,
        cache: Arc<dyn AssistCache>,
        provider: Arc<dyn AiProvider>,
    ) -> Self {
        Self {
            access,
            limiter,
            cache,
            provider,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Overrides the provider timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Summarizes the issue description
    pub async fn summarize(&self, user_id: Uuid, issue_id: Uuid) -> CoreResult<AssistOutput> {
        self.assist(user_id, issue_id, AssistKind::Summary).await
    }

    /// Suggests a resolution from the issue title and description
    pub async fn suggest(&self, user_id: Uuid, issue_id: Uuid) -> CoreResult<AssistOutput> {
        self.assist(user_id, issue_id, AssistKind::Suggestion).await
    }

    async fn assist(&self, user_id: Uuid, issue_id: Uuid, kind: AssistKind) -> CoreResult<AssistOutput> {
        let issue = self.access.verify_issue_access(user_id, issue_id).await?.issue;

        if issue.description_chars() <= AI_MIN_DESCRIPTION_CHARS {
            return Err(CoreError::validation(format!(
                "Description must be longer than {} characters for AI {}",
                AI_MIN_DESCRIPTION_CHARS,
                kind.as_str()
            )));
        }

        let decision = self.limiter.try_acquire(user_id).await;
        if !decision.allowed {
            warn!(user_id = %user_id, kind = kind.as_str(), "AI rate limit exceeded");
            return Err(CoreError::RateLimited {
                retry_after_secs: decision.retry_after_secs(),
            });
        }

        if let Some(text) = self.cache.lookup(&issue, kind).await? {
            debug!(issue_id = %issue_id, kind = kind.as_str(), "AI cache hit");
            return Ok(AssistOutput { text, cached: true });
        }
        debug!(issue_id = %issue_id, kind = kind.as_str(), "AI cache miss");

        let description = issue.description.as_deref().unwrap_or_default();
        let call = async {
            match kind {
                AssistKind::Summary => self.provider.summarize(description).await,
                AssistKind::Suggestion => self.provider.suggest(&issue.title, description).await,
            }
        };

        let text = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(issue_id = %issue_id, kind = kind.as_str(), error = %e, "AI provider call failed");
                return Err(CoreError::service(e.to_string()));
            }
            Err(_) => {
                warn!(
                    issue_id = %issue_id,
                    kind = kind.as_str(),
                    timeout_secs = self.timeout.as_secs(),
                    "AI provider call timed out"
                );
                return Err(CoreError::service(format!(
                    "AI provider did not answer within {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        self.cache.store(issue_id, kind, &text).await?;
        info!(issue_id = %issue_id, user_id = %user_id, kind = kind.as_str(), "AI output generated");

        Ok(AssistOutput { text, cached: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::cache::IssueFieldCache;
    use crate::ai::provider::ProviderError;
    use crate::ai::rate_limit::SlidingWindowLimiter;
    use crate::db::memory::MemoryStore;
    use crate::db::store::{IssueStore, ProjectStore, TeamStore};
    use crate::error::ErrorKind;
    use crate::models::issue::{CreateIssue, Issue};
    use crate::models::membership::{Membership, TeamRole};
    use crate::models::project::{Project, ProjectInput, ProjectStatus};
    use crate::models::team::Team;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl AiProvider for CountingProvider {
        async fn summarize(&self, description: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(ProviderError::Http("502 Bad Gateway".into()));
            }
            Ok(format!("Summary of {} chars", description.chars().count()))
        }

        async fn suggest(&self, title: &str, _description: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Try fixing {}", title))
        }
    }

    struct Fixture {
        gateway: AiAssistGateway,
        provider: Arc<CountingProvider>,
        owner: Uuid,
        short_issue: Uuid,
        long_issue: Uuid,
    }

    async fn fixture(provider: CountingProvider) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let team = Team::new("Platform".into(), owner);
        store
            .create_team(&team, &Membership::new(team.id, owner, TeamRole::Owner))
            .await
            .unwrap();
        let project = Project::new(
            team.id,
            owner,
            ProjectInput {
                name: "API".into(),
                description: None,
            },
        );
        store
            .create_project(&project, &ProjectStatus::defaults_for(project.id))
            .await
            .unwrap();

        let issue_with = |description: &str| {
            Issue::new(
                project.id,
                owner,
                "Backlog".into(),
                &CreateIssue {
                    title: "Timeouts".into(),
                    description: Some(description.to_string()),
                    ..Default::default()
                },
            )
        };
        let short = issue_with("8 chars!");
        let long = issue_with("Requests to /v1/export time out after thirty secs");
        store.insert_issue(&short, &[]).await.unwrap();
        store.insert_issue(&long, &[]).await.unwrap();

        let provider = Arc::new(provider);
        let gateway = AiAssistGateway::new(
            AccessResolver::new(store.clone()),
            Arc::new(SlidingWindowLimiter::default()),
            Arc::new(IssueFieldCache::new(store.clone())),
            provider.clone(),
        );

        Fixture {
            gateway,
            provider,
            owner,
            short_issue: short.id,
            long_issue: long.id,
        }
    }

    #[tokio::test]
    async fn test_short_description_rejected_before_provider() {
        let f = fixture(CountingProvider::default()).await;

        let err = f.gateway.summarize(f.owner, f.short_issue).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_summary_served_from_cache() {
        let f = fixture(CountingProvider::default()).await;

        let first = f.gateway.summarize(f.owner, f.long_issue).await.unwrap();
        assert!(!first.cached);

        let second = f.gateway.summarize(f.owner, f.long_issue).await.unwrap();
        assert!(second.cached);
        assert_eq!(first.text, second.text);
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_member_gets_not_found() {
        let f = fixture(CountingProvider::default()).await;

        let err = f.gateway.suggest(Uuid::new_v4(), f.long_issue).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_provider_failure_is_service_error_without_retry() {
        let f = fixture(CountingProvider {
            fail: true,
            ..Default::default()
        })
        .await;

        let err = f.gateway.summarize(f.owner, f.long_issue).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_service_error() {
        let f = fixture(CountingProvider {
            delay: Some(Duration::from_secs(120)),
            ..Default::default()
        })
        .await;
        let gateway = f.gateway.with_timeout(Duration::from_secs(5));

        let err = gateway.summarize(f.owner, f.long_issue).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eleventh_call_rate_limited() {
        let f = fixture(CountingProvider::default()).await;

        for _ in 0..10 {
            f.gateway.summarize(f.owner, f.long_issue).await.unwrap();
        }
        let err = f.gateway.summarize(f.owner, f.long_issue).await.unwrap_err();
        assert!(matches!(err, CoreError::RateLimited { retry_after_secs: 60 }));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(f.gateway.summarize(f.owner, f.long_issue).await.is_ok());
    }
}
