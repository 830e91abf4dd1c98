//! Query agent
//!
//! Orchestrates one query end to end:
//! prompt → plan → validated actions → results → rendered answer.
//!
//! The agent holds only read-only shared state (registry, symbol table,
//! LLM client, observers), so one instance serves concurrent queries.

mod executor;
mod lifecycle;
mod plan;
mod prompt;

use crate::error::QueryError;
use crate::interceptors::CallObserver;
use crate::llm::LlmClient;
use crate::render::Renderer;
use crate::tokens::SymbolTable;
use crate::tools::ToolRegistry;
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

pub use executor::{ActionExecutor, ActionResult};
pub use lifecycle::{QueryLifecycle, QueryState};
pub use plan::{extract_json_object, parse_plan, Action, Plan, PlanInterpreter, PlanStatus};
pub use prompt::PromptBuilder;

/// The only externally observable result of a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResponse {
    Success {
        reasoning: String,
        results: Vec<ActionResult>,
        final_answer: String,
    },
    NeedsInfo {
        request: String,
    },
    Error {
        error: String,
    },
}

impl QueryResponse {
    pub fn error(message: impl Into<String>) -> Self {
        QueryResponse::Error {
            error: message.into(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            QueryResponse::Success { .. } => "success",
            QueryResponse::NeedsInfo { .. } => "needs_info",
            QueryResponse::Error { .. } => "error",
        }
    }

    /// Text to show the user: the answer, the follow-up question or the error
    pub fn text(&self) -> &str {
        match self {
            QueryResponse::Success { final_answer, .. } => final_answer,
            QueryResponse::NeedsInfo { request } => request,
            QueryResponse::Error { error } => error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryResponse::Success { .. })
    }
}

impl From<QueryError> for QueryResponse {
    fn from(err: QueryError) -> Self {
        QueryResponse::error(err.to_string())
    }
}

pub struct QueryAgent {
    registry: Arc<ToolRegistry>,
    symbols: Arc<SymbolTable>,
    llm: Arc<dyn LlmClient>,
    observers: Vec<Arc<dyn CallObserver>>,
}

impl QueryAgent {
    pub fn new(
        registry: Arc<ToolRegistry>,
        symbols: Arc<SymbolTable>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            registry,
            symbols,
            llm,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Answer a natural-language question. Never fails: every problem
    /// becomes an error response.
    pub async fn answer(&self, query: &str) -> QueryResponse {
        let query_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("query", query_id = %query_id);
        self.run(&query_id, query).instrument(span).await
    }

    async fn run(&self, query_id: &str, query: &str) -> QueryResponse {
        let mut lifecycle = QueryLifecycle::new();
        let query = query.trim();
        if query.is_empty() {
            lifecycle.advance(QueryState::Failed);
            return QueryResponse::error("Please ask a question about prices, pools or swap rates.");
        }
        tracing::info!(query = query, "Received query");

        lifecycle.advance(QueryState::Interpreting);
        let prompt = PromptBuilder::new(&self.registry, &self.symbols).build(query);
        let plan = match PlanInterpreter::new(self.llm.as_ref(), &self.observers)
            .interpret(query_id, &prompt)
            .await
        {
            Ok(plan) => plan,
            Err(e) => return fail(&mut lifecycle, e),
        };
        tracing::info!(
            status = ?plan.status,
            actions = plan.actions.len(),
            reasoning = %plan.reasoning,
            "Interpreted plan"
        );

        match plan.status {
            PlanStatus::NeedsInfo => {
                lifecycle.advance(QueryState::NeedsInfo);
                return QueryResponse::NeedsInfo {
                    request: plan.request.unwrap_or_default(),
                };
            }
            PlanStatus::Error => {
                lifecycle.advance(QueryState::Failed);
                return QueryResponse::error(plan.error_message.unwrap_or_default());
            }
            PlanStatus::Success => {}
        }

        lifecycle.advance(QueryState::Executing);
        let executor = ActionExecutor::new(&self.registry, &self.symbols, &self.observers);
        let results = match executor.execute(query_id, &plan.actions).await {
            Ok(results) => results,
            Err(e) => return fail(&mut lifecycle, e),
        };

        lifecycle.advance(QueryState::Rendering);
        let final_answer = Renderer::new(&self.symbols).render(&plan.answer_template, &results);
        lifecycle.advance(QueryState::Succeeded);
        tracing::info!(results = results.len(), "Query succeeded");

        QueryResponse::Success {
            reasoning: plan.reasoning,
            results,
            final_answer,
        }
    }
}

fn fail(lifecycle: &mut QueryLifecycle, err: QueryError) -> QueryResponse {
    tracing::warn!(state = %lifecycle.state(), error = %err, "Query failed");
    lifecycle.advance(QueryState::Failed);
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::market::{MarketDataProvider, StaticMarketData, TokenPrice};
    use crate::tokens::coin_types::{SUI, USDC};
    use crate::tools::default_registry;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// LLM double that replays a fixed reply; `None` simulates a timeout
    struct ScriptedLlm {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn timing_out() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(LlmError::Timeout)
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn sui_market() -> StaticMarketData {
        StaticMarketData::demo().with_price(
            SUI,
            TokenPrice {
                current: 1.23,
                previous: 1.20,
                last_updated: 0,
                price_change_24h: 2.50,
            },
        )
    }

    fn agent_with(llm: Arc<dyn LlmClient>, provider: impl MarketDataProvider + 'static) -> QueryAgent {
        let registry = default_registry(Arc::new(provider)).unwrap();
        QueryAgent::new(Arc::new(registry), Arc::new(SymbolTable::builtin()), llm)
    }

    fn agent(reply: &str) -> QueryAgent {
        agent_with(ScriptedLlm::replying(reply), sui_market())
    }

    #[tokio::test]
    async fn test_success_preserves_action_order() {
        let reply = json!({
            "status": "success",
            "reasoning": "Two prices and a pool",
            "actions": [
                {"tool": "get_token_price", "input": {"symbol": "SUI"}},
                {"tool": "get_top_pools", "input": {"limit": 1}},
                {"tool": "get_token_price", "input": {"symbol": "USDC"}}
            ],
            "answerTemplate": ""
        })
        .to_string();
        let response = agent(&reply).answer("SUI, USDC and the biggest pool").await;

        let QueryResponse::Success { results, reasoning, .. } = &response else {
            panic!("expected success, got {:?}", response);
        };
        assert_eq!(reasoning, "Two prices and a pool");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].input, json!({"symbol": SUI}));
        assert_eq!(results[1].tool, "get_top_pools");
        assert_eq!(results[2].input, json!({"symbol": USDC}));
    }

    #[tokio::test]
    async fn test_sui_price_scenario() {
        let reply = r#"{"status":"success","reasoning":"price",
            "actions":[{"tool":"get_token_price","input":{"symbol":"SUI"}}],
            "answerTemplate":"${result.current}"}"#;
        assert_eq!(agent(reply).answer("SUI price?").await.text(), "1.230");

        let reply = r#"{"status":"success","reasoning":"price",
            "actions":[{"tool":"get_token_price","input":{"symbol":"sui"}}],
            "answerTemplate":""}"#;
        assert_eq!(
            agent(reply).answer("SUI price?").await.text(),
            "SUI: $1.2300 (+2.50%)"
        );
    }

    #[tokio::test]
    async fn test_unparseable_plan_is_an_error() {
        for reply in ["Sorry, I don't know.", "{\"status\": ", "```\nnope\n```", "{}"] {
            let response = agent(reply).answer("What is up?").await;
            assert_eq!(response.status(), "error", "reply {:?}", reply);
        }
    }

    #[tokio::test]
    async fn test_fenced_plan_inside_prose() {
        let reply = "Here's my plan:\n```json\n{\"status\":\"success\",\"reasoning\":\"r\",\
            \"actions\":[{\"tool\":\"apr_to_apy\",\"input\":{\"apr\":1234.5,\"compounds_per_year\":1}}],\
            \"answerTemplate\":\"APY ${result}\"}\n```\nHope that helps!";
        let response = agent(reply).answer("convert").await;
        assert!(response.is_success());
        assert_eq!(response.text(), "APY 1234.500");
    }

    #[tokio::test]
    async fn test_missing_parameter_names_field_and_tool() {
        let reply = r#"{"status":"success","actions":[{"tool":"get_pool_info","input":{}}]}"#;
        let response = agent(reply).answer("pool info").await;
        assert_eq!(response.status(), "error");
        assert!(response.text().contains("pool_id"));
        assert!(response.text().contains("get_pool_info"));
    }

    #[tokio::test]
    async fn test_second_action_failure_discards_first_result() {
        let reply = r#"{"status":"success","reasoning":"two",
            "actions":[
                {"tool":"get_token_price","input":{"symbol":"SUI"}},
                {"tool":"get_pool_info","input":{"pool_id":"0xdead"}}
            ],
            "answerTemplate":"${result.current}"}"#;
        let response = agent(reply).answer("two things").await;

        let QueryResponse::Error { error } = &response else {
            panic!("expected error, got {:?}", response);
        };
        assert!(error.contains("get_pool_info"));
        let serialized = serde_json::to_value(&response).unwrap();
        assert_eq!(serialized, json!({"status": "error", "error": error}));
    }

    #[tokio::test]
    async fn test_needs_info_relayed_verbatim() {
        let reply = r#"{"status":"needs_info","request":"Which pool do you mean?",
            "actions":[{"tool":"get_all_pools","input":{}}]}"#;
        let response = agent(reply).answer("How deep is the pool?").await;
        assert_eq!(
            response,
            QueryResponse::NeedsInfo {
                request: "Which pool do you mean?".to_string()
            }
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "needs_info", "request": "Which pool do you mean?"})
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_and_symbol() {
        let response = agent(r#"{"status":"success","actions":[{"tool":"get_weather","input":{}}]}"#)
            .answer("weather")
            .await;
        assert!(response.text().contains("get_weather"));

        let response = agent(
            r#"{"status":"success","actions":[{"tool":"get_token_price","input":{"symbol":"DOGE"}}]}"#,
        )
        .answer("doge")
        .await;
        assert!(response.text().contains("DOGE"));
    }

    #[tokio::test]
    async fn test_llm_failure_is_an_error_and_not_retried() {
        let llm = ScriptedLlm::timing_out();
        let agent = agent_with(llm.clone(), sui_market());
        let response = agent.answer("SUI price?").await;
        assert_eq!(response.status(), "error");
        assert!(response.text().contains("timed out"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_query_skips_llm() {
        let llm = ScriptedLlm::replying("{}");
        let agent = agent_with(llm.clone(), sui_market());
        assert_eq!(agent.answer("   ").await.status(), "error");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_serializes_with_results() {
        let reply = r#"{"status":"success","reasoning":"spot",
            "actions":[{"tool":"get_spot_price","input":{
                "pool_id":"0x5eb2dfcdd1b15d2021328258f6d5ec081e9a0cdcfa9e13a0eaeb9b5f7505ca78",
                "coin_in":"SUI","coin_out":"USDC"}}],
            "answerTemplate":"Swap rate: ${result}"}"#;
        let response = agent(reply).answer("SUI to USDC rate").await;
        assert_eq!(response.text(), "Swap rate: 1 SUI = 1.229175 USDC");

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["final_answer"], "Swap rate: 1 SUI = 1.229175 USDC");
        assert_eq!(value["results"][0]["tool"], "get_spot_price");
        assert_eq!(value["results"][0]["input"]["with_fees"], json!(true));
        assert!(value["results"][0].get("shape").is_none());
    }
}
