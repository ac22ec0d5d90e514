/// Configuration management for the worker host
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `AI_API_KEY`: provider key; when absent every AI call fails as a service error
/// - `AI_API_BASE`: OpenAI-compatible endpoint (default: https://api.openai.com/v1)
/// - `AI_MODEL`: chat model (default: gpt-3.5-turbo)
/// - `AI_TIMEOUT_SECS`: provider call timeout, 1 to 120 (default: 30)
/// - `AI_RATE_LIMIT_PER_MINUTE`: AI calls per user per minute (default: 10)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
/// - `RUST_LOG`: log filter (default: teamboard_worker=debug,teamboard_shared=info)
///
/// # Example
///
/// ```no_run
/// use teamboard_worker::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("AI model: {}", config.ai.model);
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use teamboard_shared::services::AssistSettings;

pub const DEFAULT_AI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_AI_MODEL: &str = "gpt-3.5-turbo";
const MAX_AI_TIMEOUT_SECS: u64 = 120;

/// Complete worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub service: ServiceConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// AI provider and gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider API key. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub api_base: String,

    pub model: String,

    pub timeout_secs: u64,

    /// Calls per user within one minute
    pub rate_limit_per_minute: usize,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Host process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing
    /// - a numeric variable does not parse
    /// - `AI_TIMEOUT_SECS` is outside 1..=120
    /// - `LOG_FORMAT` is neither `pretty` nor `json`
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let timeout_secs = lookup("AI_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u64>()
            .context("AI_TIMEOUT_SECS must be an integer")?;
        if !(1..=MAX_AI_TIMEOUT_SECS).contains(&timeout_secs) {
            anyhow::bail!(
                "AI_TIMEOUT_SECS must be between 1 and {}, got {}",
                MAX_AI_TIMEOUT_SECS,
                timeout_secs
            );
        }

        let rate_limit_per_minute = lookup("AI_RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|| "10".to_string())
            .parse::<usize>()
            .context("AI_RATE_LIMIT_PER_MINUTE must be a positive integer")?;
        if rate_limit_per_minute == 0 {
            anyhow::bail!("AI_RATE_LIMIT_PER_MINUTE must be at least 1");
        }

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        };

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            ai: AiConfig {
                api_key: lookup("AI_API_KEY").filter(|k| !k.trim().is_empty()),
                api_base: lookup("AI_API_BASE").unwrap_or_else(|| DEFAULT_AI_API_BASE.to_string()),
                model: lookup("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
                timeout_secs,
                rate_limit_per_minute,
            },
            service: ServiceConfig { log_format },
        })
    }

    /// Gateway settings derived from the AI section
    pub fn assist_settings(&self) -> AssistSettings {
        AssistSettings {
            max_calls: self.ai.rate_limit_per_minute,
            window: Duration::from_secs(60),
            provider_timeout: Duration::from_secs(self.ai.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgresql://localhost/teamboard")]).unwrap();

        assert_eq!(config.database.max_connections, 10);
        assert!(config.ai.api_key.is_none());
        assert_eq!(config.ai.api_base, DEFAULT_AI_API_BASE);
        assert_eq!(config.ai.model, DEFAULT_AI_MODEL);
        assert_eq!(config.ai.timeout_secs, 30);
        assert_eq!(config.service.log_format, LogFormat::Pretty);

        let settings = config.assist_settings();
        assert_eq!(settings.max_calls, 10);
        assert_eq!(settings.window, Duration::from_secs(60));
    }

    #[test]
    fn test_database_url_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        let base = ("DATABASE_URL", "postgresql://localhost/teamboard");

        assert!(load(&[base, ("AI_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[base, ("AI_TIMEOUT_SECS", "121")]).is_err());
        assert!(load(&[base, ("AI_TIMEOUT_SECS", "soon")]).is_err());
        assert_eq!(load(&[base, ("AI_TIMEOUT_SECS", "120")]).unwrap().ai.timeout_secs, 120);
    }

    #[test]
    fn test_log_format_and_key() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/teamboard"),
            ("LOG_FORMAT", "json"),
            ("AI_API_KEY", "sk-test"),
        ])
        .unwrap();
        assert_eq!(config.service.log_format, LogFormat::Json);
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-test"));

        assert!(load(&[
            ("DATABASE_URL", "postgresql://localhost/teamboard"),
            ("LOG_FORMAT", "xml"),
        ])
        .is_err());
    }
}
