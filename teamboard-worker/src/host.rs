/// Service host
///
/// Owns the wired core services and the notification event loop.
///
/// # Architecture
///
/// ```text
/// ServiceHost
///   ├─> Services: engine, teams, projects, comments, gateway (handed to callers)
///   └─> event loop: EventReceiver ──► NotificationDispatcher ──► store
/// ```
///
/// # Shutdown
///
/// Cancelling the shutdown token stops the loop from waiting for new events.
/// Events already queued are dispatched before `run` returns, so a mutation
/// that completed before shutdown still gets its notifications.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use teamboard_shared::db::MemoryStore;
/// use teamboard_shared::services::{AssistSettings, Services};
/// use teamboard_worker::host::ServiceHost;
/// use teamboard_worker::mailer::LogMailer;
/// # use teamboard_shared::ai::AiProvider;
///
/// # async fn example(provider: Arc<dyn AiProvider>) -> anyhow::Result<()> {
/// let (services, events) = Services::build(
///     Arc::new(MemoryStore::new()),
///     provider,
///     Arc::new(LogMailer),
///     AssistSettings::default(),
/// );
/// let host = ServiceHost::new(services, events);
/// let shutdown = host.shutdown_token();
///
/// let handle = tokio::spawn(host.run());
/// shutdown.cancel();
/// let stats = handle.await??;
/// println!("dispatched {} events", stats.dispatched);
/// # Ok(())
/// # }
/// ```

use teamboard_shared::notify::EventReceiver;
use teamboard_shared::services::Services;
use tokio_util::sync::CancellationToken;

/// Counters reported when the host stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    /// Events dispatched in total
    pub dispatched: usize,

    /// Of those, events drained after shutdown was requested
    pub drained_on_shutdown: usize,
}

pub struct ServiceHost {
    services: Services,
    events: EventReceiver,
    shutdown_token: CancellationToken,
}

impl ServiceHost {
    pub fn new(services: Services, events: EventReceiver) -> Self {
        ServiceHost {
            services,
            events,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Services for callers (routing layer, jobs) to drive
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Gets shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the notification loop until shutdown is requested
    pub async fn run(mut self) -> anyhow::Result<HostStats> {
        tracing::info!("Service host starting notification loop");
        let mut stats = HostStats::default();

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Shutdown requested, draining queued events");
                    break;
                }

                event = self.events.recv() => match event {
                    Some(event) => {
                        let delivered = self.services.dispatcher.dispatch(&event).await;
                        stats.dispatched += 1;
                        tracing::debug!(event = event.kind(), delivered, "Event dispatched");
                    }
                    None => {
                        tracing::warn!("Event channel closed unexpectedly");
                        return Ok(stats);
                    }
                },
            }
        }

        stats.drained_on_shutdown = self
            .services
            .dispatcher
            .drain_pending(&mut self.events)
            .await;
        stats.dispatched += stats.drained_on_shutdown;

        tracing::info!(
            dispatched = stats.dispatched,
            drained = stats.drained_on_shutdown,
            "Service host shut down"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::LogMailer;
    use async_trait::async_trait;
    use std::sync::Arc;
    use teamboard_shared::ai::{AiProvider, ProviderError};
    use teamboard_shared::db::{MemoryStore, UserStore};
    use teamboard_shared::models::team::{InviteInput, TeamInput};
    use teamboard_shared::models::user::{CreateUser, User};
    use teamboard_shared::services::AssistSettings;

    struct Unconfigured;

    #[async_trait]
    impl AiProvider for Unconfigured {
        async fn summarize(&self, _description: &str) -> Result<String, ProviderError> {
            Err(ProviderError::NotConfigured)
        }

        async fn suggest(&self, _title: &str, _description: &str) -> Result<String, ProviderError> {
            Err(ProviderError::NotConfigured)
        }
    }

    async fn user(store: &MemoryStore, name: &str) -> User {
        let user = User::new(CreateUser {
            email: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
        });
        store.insert_user(&user).await.unwrap();
        user
    }

    fn host(store: Arc<MemoryStore>) -> ServiceHost {
        let (services, events) = Services::build(
            store,
            Arc::new(Unconfigured),
            Arc::new(LogMailer),
            AssistSettings::default(),
        );
        ServiceHost::new(services, events)
    }

    #[tokio::test]
    async fn test_queued_events_drained_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let alice = user(&store, "Alice").await;
        let bob = user(&store, "Bob").await;
        let host = host(store);
        let services = host.services().clone();

        let team = services
            .teams
            .create_team(alice.id, TeamInput { name: "Platform".into() })
            .await
            .unwrap();
        let issued = services
            .teams
            .invite_member(alice.id, team.id, InviteInput { email: bob.email.clone() })
            .await
            .unwrap();
        services.teams.accept_invite(bob.id, &issued.token).await.unwrap();

        // Cancelled before the loop starts: the event must still be delivered
        let shutdown = host.shutdown_token();
        shutdown.cancel();
        let stats = host.run().await.unwrap();

        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.drained_on_shutdown, 1);
        assert_eq!(services.dispatcher.unread_count(alice.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_events_dispatched_before_stop() {
        let store = Arc::new(MemoryStore::new());
        let alice = user(&store, "Alice").await;
        let bob = user(&store, "Bob").await;
        let host = host(store);
        let services = host.services().clone();
        let shutdown = host.shutdown_token();
        let handle = tokio::spawn(host.run());

        let team = services
            .teams
            .create_team(alice.id, TeamInput { name: "Platform".into() })
            .await
            .unwrap();
        let issued = services
            .teams
            .invite_member(alice.id, team.id, InviteInput { email: bob.email.clone() })
            .await
            .unwrap();
        services.teams.accept_invite(bob.id, &issued.token).await.unwrap();

        // Either the loop or the shutdown drain delivers it
        shutdown.cancel();
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(services.dispatcher.unread_count(alice.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_service_error() {
        let store = Arc::new(MemoryStore::new());
        let alice = user(&store, "Alice").await;
        let host = host(store);
        let services = host.services();

        let team = services
            .teams
            .create_team(alice.id, TeamInput { name: "Platform".into() })
            .await
            .unwrap();
        let project = services
            .projects
            .create_project(
                alice.id,
                team.id,
                teamboard_shared::models::project::ProjectInput {
                    name: "Website".into(),
                    description: None,
                },
            )
            .await
            .unwrap();
        let issue = services
            .engine
            .create_issue(
                alice.id,
                project.id,
                teamboard_shared::models::issue::CreateIssue {
                    title: "Search".into(),
                    description: Some("Search returns stale results".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = services.gateway.summarize(alice.id, issue.issue.id).await.unwrap_err();
        assert_eq!(err.kind(), teamboard_shared::error::ErrorKind::Service);
    }
}
