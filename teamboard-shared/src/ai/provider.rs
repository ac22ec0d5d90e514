/// External AI provider collaborator
///
/// Prompt wording, model choice and sampling parameters belong to the
/// implementation; the gateway only sees text in and text out.

use async_trait::async_trait;

/// Provider failure. Every variant surfaces to callers as a service error.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure or non-success status
    #[error("AI provider request failed: {0}")]
    Http(String),

    /// Response could not be interpreted
    #[error("AI provider returned an unexpected response: {0}")]
    BadResponse(String),

    /// No credentials configured
    #[error("AI provider is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Short summary of an issue description
    async fn summarize(&self, description: &str) -> Result<String, ProviderError>;

    /// Suggested approach for resolving an issue
    async fn suggest(&self, title: &str, description: &str) -> Result<String, ProviderError>;
}
