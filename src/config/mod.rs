//! Configuration for the DeFi query agent

pub mod endpoints;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub use endpoints::LlmEndpoint;

/// LLM settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible base URL (overridable from the environment)
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature (`null` leaves it to the provider)
    pub temperature: Option<f32>,
    /// Completion token cap
    pub max_tokens: Option<u32>,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: endpoints::provider_urls::ATOMA.to_string(),
            model: "meta-llama/Llama-3.3-70B-Instruct".to_string(),
            temperature: Some(0.1), // Plans should be deterministic-ish
            max_tokens: Some(1024),
            request_timeout_secs: 45,
        }
    }
}

/// Market data backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataSettings {
    /// REST analytics backend base URL
    pub base_url: String,
    /// Response cache TTL (seconds, 0 disables caching)
    pub cache_ttl_secs: u64,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787/api".to_string(),
            cache_ttl_secs: 30,
            request_timeout_secs: 15,
        }
    }
}

/// Main configuration. Every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmSettings,
    /// Market data settings
    pub market_data: MarketDataSettings,
    /// Wall-clock budget for one query (seconds)
    pub query_timeout_secs: u64,
    /// Path to audit log file
    pub audit_log_path: Option<String>,
    /// Extra symbol → coin type entries, merged over the built-in table
    pub symbols: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            market_data: MarketDataSettings::default(),
            query_timeout_secs: 60,
            audit_log_path: None,
            symbols: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from a JSON file, or defaults when no path is given.
    /// Environment overrides are applied either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&content).map_err(|e| {
                    Error::Config(format!("Invalid config {}: {}", path.display(), e))
                })?
            }
            None => Config::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides that are not secrets (secrets are read by `LlmEndpoint`)
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(endpoints::env_vars::MARKET_DATA_URL) {
            tracing::debug!("Using MARKET_DATA_URL for the market data backend");
            self.market_data.base_url = url;
        }
    }

    /// Check values that would otherwise fail late, mid-query
    pub fn validate(&self) -> Result<()> {
        for (name, raw) in [
            ("llm.base_url", &self.llm.base_url),
            ("market_data.base_url", &self.market_data.base_url),
        ] {
            url::Url::parse(raw)
                .map_err(|e| Error::Config(format!("{} '{}' is not a valid URL: {}", name, raw, e)))?;
        }
        if self.query_timeout_secs == 0 {
            return Err(Error::Config(
                "query_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(Error::Config("llm.model must not be empty".to_string()));
        }
        Ok(())
    }
}
