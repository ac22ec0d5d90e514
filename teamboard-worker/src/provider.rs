/// OpenAI-compatible AI provider
///
/// Implements [`AiProvider`] over a chat-completions endpoint. Without an API
/// key every call returns [`ProviderError::NotConfigured`], which the gateway
/// reports as a service error.
///
/// The gateway bounds each call with its own timeout; the client timeout here
/// is only a backstop for connections that never finish.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use teamboard_shared::ai::{AiProvider, ProviderError};

use crate::config::AiConfig;

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes issue descriptions in 2-4 sentences.";
const SUGGESTION_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that suggests approaches to solve issues.";

/// Chat-completions client
pub struct HttpAiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl HttpAiProvider {
    /// Builds the provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs + 5))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(
        &self,
        system: &str,
        user_message: String,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_message,
                },
            ],
            max_tokens,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "AI provider returned an error status");
            return Err(ProviderError::Http(format!("{}: {}", status, truncate(&body, 200))));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))?;

        extract_text(body)
    }
}

#[async_trait]
impl AiProvider for HttpAiProvider {
    async fn summarize(&self, description: &str) -> Result<String, ProviderError> {
        self.complete(
            SUMMARY_SYSTEM_PROMPT,
            format!("Summarize this issue in 2-4 sentences:\n\n{}", description),
            150,
        )
        .await
    }

    async fn suggest(&self, title: &str, description: &str) -> Result<String, ProviderError> {
        self.complete(
            SUGGESTION_SYSTEM_PROMPT,
            format!(
                "Suggest an approach to solve this issue:\n\nTitle: {}\nDescription: {}",
                title, description
            ),
            200,
        )
        .await
    }
}

fn extract_text(body: ChatResponse) -> Result<String, ProviderError> {
    let text = body
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.trim().to_string())
        .ok_or_else(|| ProviderError::BadResponse("response has no choices".into()))?;

    if text.is_empty() {
        return Err(ProviderError::BadResponse("response text is empty".into()));
    }
    Ok(text)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}
