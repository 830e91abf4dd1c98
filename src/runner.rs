//! Agent runner module
//!
//! Wires configuration into a ready `QueryAgent`: market data provider,
//! tool registry, symbol table, LLM client and observers. Also owns the
//! wall-clock budget for a query, which the core leaves to its caller.

use crate::agent::{QueryAgent, QueryResponse};
use crate::config::{Config, LlmEndpoint};
use crate::interceptors::AuditLogInterceptor;
use crate::llm::{ChatCompletionsClient, LlmClient};
use crate::market::{HttpMarketData, MarketDataProvider, StaticMarketData};
use crate::tokens::SymbolTable;
use crate::tools::{default_registry, ToolRegistry};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Builds and drives the query agent
pub struct AgentRunner {
    config: Config,
    offline: bool,
}

impl AgentRunner {
    /// Create a new agent runner. `offline` swaps the market data backend
    /// for a built-in snapshot.
    pub fn new(config: Config, offline: bool) -> Self {
        Self { config, offline }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Built-in symbols merged with configured ones
    pub fn symbol_table(&self) -> SymbolTable {
        SymbolTable::builtin().with_overrides(&self.config.symbols)
    }

    /// Market data adapter selected by mode
    pub fn build_provider(&self) -> Result<Arc<dyn MarketDataProvider>> {
        if self.offline {
            info!("Using offline market snapshot");
            return Ok(Arc::new(StaticMarketData::demo()));
        }

        let settings = &self.config.market_data;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        info!(
            base_url = %settings.base_url,
            cache_ttl_secs = settings.cache_ttl_secs,
            "Using HTTP market data backend"
        );
        Ok(Arc::new(HttpMarketData::with_client(
            client,
            settings.base_url.clone(),
            Duration::from_secs(settings.cache_ttl_secs),
        )))
    }

    pub fn build_registry(&self, provider: Arc<dyn MarketDataProvider>) -> Result<ToolRegistry> {
        let registry = default_registry(provider)?;
        info!(tools = registry.len(), "Registered tools");
        Ok(registry)
    }

    /// Build the agent with the configured LLM endpoint
    pub fn build_agent(&self) -> Result<QueryAgent> {
        self.config.validate()?;

        let endpoint = LlmEndpoint::from_env(&self.config.llm);
        if !endpoint.has_api_key() {
            warn!(
                base_url = %endpoint.base_url,
                "No LLM API key configured, requests will be unauthenticated"
            );
        }
        info!(
            source = endpoint.source,
            base_url = %endpoint.base_url,
            model = %self.config.llm.model,
            "Using LLM endpoint"
        );
        let llm = ChatCompletionsClient::new(endpoint, &self.config.llm)?;

        self.build_agent_with(Arc::new(llm), self.build_provider()?)
    }

    /// Build the agent around an explicit LLM and provider
    pub fn build_agent_with(
        &self,
        llm: Arc<dyn LlmClient>,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Result<QueryAgent> {
        let registry = self.build_registry(provider)?;
        let symbols = self.symbol_table();
        info!(symbols = symbols.len(), "Loaded symbol table");

        let mut agent = QueryAgent::new(Arc::new(registry), Arc::new(symbols), llm);
        if let Some(audit_path) = &self.config.audit_log_path {
            agent = agent.with_observer(Arc::new(AuditLogInterceptor::new(audit_path)));
            info!(audit_path = %audit_path, "Added audit log interceptor");
        }
        Ok(agent)
    }

    /// Answer one query within the configured time budget
    pub async fn run_query(&self, agent: &QueryAgent, query: &str) -> QueryResponse {
        let budget = Duration::from_secs(self.config.query_timeout_secs);
        run_query_with_timeout(agent, query, budget).await
    }
}

/// A query that outlives its budget becomes an error response. The in-flight
/// call is dropped, not awaited.
pub async fn run_query_with_timeout(
    agent: &QueryAgent,
    query: &str,
    budget: Duration,
) -> QueryResponse {
    match tokio::time::timeout(budget, agent.answer(query)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(budget_secs = budget.as_secs_f64(), "Query timed out");
            QueryResponse::error(format!(
                "Query timed out after {} seconds",
                budget.as_secs()
            ))
        }
    }
}
