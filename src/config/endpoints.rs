//! LLM endpoint resolution
//!
//! Supports several configuration methods, resolved in priority order:
//! 1. `LLM_BASE_URL` (+ optional `LLM_API_KEY`) - any OpenAI-compatible endpoint
//! 2. `LLM_API_KEY` alone - key for the `llm.base_url` from the config file
//! 3. Provider API keys (`ATOMA_API_KEY`, `OPENAI_API_KEY`, `OPENROUTER_API_KEY`)
//! 4. The configured `llm.base_url` without a key (local model servers)
//!
//! # Examples
//!
//! ```bash
//! # Option 1: Self-hosted or proxied endpoint
//! export LLM_BASE_URL="http://localhost:11434/v1"
//!
//! # Option 2: Hosted provider key
//! export ATOMA_API_KEY="YOUR_KEY"
//! ```

use super::LlmSettings;
use secrecy::SecretString;

/// Environment variable names
pub mod env_vars {
    pub const LLM_BASE_URL: &str = "LLM_BASE_URL";
    pub const LLM_API_KEY: &str = "LLM_API_KEY";
    pub const ATOMA_API_KEY: &str = "ATOMA_API_KEY";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
    pub const MARKET_DATA_URL: &str = "MARKET_DATA_URL";
}

/// Hosted provider base URLs
pub mod provider_urls {
    pub const ATOMA: &str = "https://api.atoma.network/v1";
    pub const OPENAI: &str = "https://api.openai.com/v1";
    pub const OPENROUTER: &str = "https://openrouter.ai/api/v1";
}

/// Resolved LLM endpoint
#[derive(Debug, Clone)]
pub struct LlmEndpoint {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    /// Where the endpoint came from, for logging
    pub source: &'static str,
}

impl LlmEndpoint {
    /// Resolve from process environment variables
    pub fn from_env(settings: &LlmSettings) -> Self {
        Self::resolve(settings, |name| std::env::var(name).ok())
    }

    /// Resolve using an arbitrary variable lookup
    pub fn resolve(settings: &LlmSettings, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let key = |name: &str| get(name).map(SecretString::from);

        // Priority 1: explicit endpoint
        if let Some(base_url) = get(env_vars::LLM_BASE_URL) {
            tracing::debug!("Using LLM_BASE_URL for the LLM endpoint");
            return Self {
                base_url,
                api_key: key(env_vars::LLM_API_KEY),
                source: env_vars::LLM_BASE_URL,
            };
        }

        // Priority 2: key for the configured endpoint
        if let Some(api_key) = key(env_vars::LLM_API_KEY) {
            return Self {
                base_url: settings.base_url.clone(),
                api_key: Some(api_key),
                source: env_vars::LLM_API_KEY,
            };
        }

        // Priority 3: provider keys
        for (var, url) in [
            (env_vars::ATOMA_API_KEY, provider_urls::ATOMA),
            (env_vars::OPENAI_API_KEY, provider_urls::OPENAI),
            (env_vars::OPENROUTER_API_KEY, provider_urls::OPENROUTER),
        ] {
            if let Some(api_key) = key(var) {
                tracing::info!(source = var, base_url = url, "Building LLM endpoint from API key");
                return Self {
                    base_url: url.to_string(),
                    api_key: Some(api_key),
                    source: var,
                };
            }
        }

        // Priority 4: configured endpoint, unauthenticated
        Self {
            base_url: settings.base_url.clone(),
            api_key: None,
            source: "config",
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
