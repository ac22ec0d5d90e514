/// AI assist: limiter, cache, provider interface and the gateway tying them together
///
/// - [`rate_limit`]: per-user sliding-window limiter
/// - [`cache`]: non-expiring cache of AI output
/// - [`provider`]: external provider interface
/// - [`gateway`]: the gated, cached entry point

pub mod cache;
pub mod gateway;
pub mod provider;
pub mod rate_limit;

pub use cache::{AssistCache, AssistKind, IssueFieldCache};
pub use gateway::{AiAssistGateway, AssistOutput};
pub use provider::{AiProvider, ProviderError};
pub use rate_limit::{CallLimiter, RateDecision, SlidingWindowLimiter};
