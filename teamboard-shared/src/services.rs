/// Composition of the core services over one store
///
/// Every service shares the same store, access resolver and event sink. The
/// returned [`EventReceiver`] must be handed to
/// [`NotificationDispatcher::run_until_closed`] (or drained) by the host;
/// otherwise events accumulate in memory.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use teamboard_shared::db::MemoryStore;
/// use teamboard_shared::services::{AssistSettings, Services};
/// # use teamboard_shared::ai::{AiProvider, ProviderError};
/// # use teamboard_shared::notify::{MailError, Mailer};
/// # struct Offline;
/// # #[async_trait::async_trait]
/// # impl AiProvider for Offline {
/// #     async fn summarize(&self, _: &str) -> Result<String, ProviderError> { Err(ProviderError::NotConfigured) }
/// #     async fn suggest(&self, _: &str, _: &str) -> Result<String, ProviderError> { Err(ProviderError::NotConfigured) }
/// # }
/// # #[async_trait::async_trait]
/// # impl Mailer for Offline {
/// #     async fn send_invite(&self, _: &str, _: &str, _: &str, _: &str) -> Result<(), MailError> { Ok(()) }
/// # }
///
/// let (services, events) = Services::build(
///     Arc::new(MemoryStore::new()),
///     Arc::new(Offline),
///     Arc::new(Offline),
///     AssistSettings::default(),
/// );
/// # async fn host(services: Services, events: teamboard_shared::notify::EventReceiver) {
/// tokio::spawn(async move { services.dispatcher.run_until_closed(events).await });
/// # }
/// # let _ = (services, events);
/// ```

use std::sync::Arc;
use std::time::Duration;

use crate::ai::cache::IssueFieldCache;
use crate::ai::gateway::{AiAssistGateway, DEFAULT_PROVIDER_TIMEOUT};
use crate::ai::provider::AiProvider;
use crate::ai::rate_limit::{SlidingWindowLimiter, DEFAULT_MAX_CALLS, DEFAULT_WINDOW};
use crate::auth::authorization::AccessResolver;
use crate::db::store::Store;
use crate::notify::dispatcher::NotificationDispatcher;
use crate::notify::events::{EventReceiver, EventSink};
use crate::notify::mailer::Mailer;
use crate::workflow::{CommentService, ProjectService, TeamService, WorkflowEngine};

/// AI gateway tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistSettings {
    /// Calls allowed per user within `window`
    pub max_calls: usize,
    pub window: Duration,
    pub provider_timeout: Duration,
}

impl Default for AssistSettings {
    fn default() -> Self {
        Self {
            max_calls: DEFAULT_MAX_CALLS,
            window: DEFAULT_WINDOW,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

/// Every core service, wired together
#[derive(Clone)]
pub struct Services {
    pub access: AccessResolver,
    pub engine: WorkflowEngine,
    pub teams: TeamService,
    pub projects: ProjectService,
    pub comments: CommentService,
    pub dispatcher: NotificationDispatcher,
    pub gateway: Arc<AiAssistGateway>,
}

impl Services {
    pub fn build<S>(
        store: Arc<S>,
        provider: Arc<dyn AiProvider>,
        mailer: Arc<dyn Mailer>,
        settings: AssistSettings,
    ) -> (Services, EventReceiver)
    where
        S: Store + 'static,
    {
        let (events, receiver) = EventSink::channel();
        let access = AccessResolver::new(store.clone());
        let shared: Arc<dyn Store> = store.clone();

        let limiter = SlidingWindowLimiter::new(settings.max_calls, settings.window);
        let gateway = AiAssistGateway::new(
            access.clone(),
            Arc::new(limiter),
            Arc::new(IssueFieldCache::new(store.clone())),
            provider,
        )
        .with_timeout(settings.provider_timeout);

        let services = Services {
            engine: WorkflowEngine::new(shared.clone(), access.clone(), events.clone()),
            teams: TeamService::new(shared.clone(), access.clone(), events.clone(), mailer),
            projects: ProjectService::new(shared.clone(), access.clone()),
            comments: CommentService::new(shared, access.clone(), events),
            dispatcher: NotificationDispatcher::new(store),
            gateway: Arc::new(gateway),
            access,
        };

        (services, receiver)
    }
}
