//! Call observers
//!
//! Observers see every LLM call and tool call a query makes, after it
//! completes. They cannot alter results; the executor and agent ignore
//! anything an observer does.

mod audit_log;

use crate::error::ToolError;
use crate::llm::LlmError;
use async_trait::async_trait;
use serde_json::Value;

pub use audit_log::AuditLogInterceptor;

/// Context for a completed tool call
#[derive(Debug, Clone)]
pub struct ToolCallContext {
    pub query_id: String,
    pub tool_name: String,
    /// Arguments as dispatched (symbols already resolved)
    pub args: Value,
}

/// Context for a completed LLM call
#[derive(Debug, Clone)]
pub struct LlmCallContext {
    pub query_id: String,
    pub model: String,
    pub prompt: String,
}

#[async_trait]
pub trait CallObserver: Send + Sync {
    async fn on_llm_call_complete(
        &self,
        _context: &LlmCallContext,
        _result: &Result<String, LlmError>,
        _duration_ms: u64,
    ) {
    }

    async fn on_tool_call_complete(
        &self,
        _context: &ToolCallContext,
        _result: &Result<Value, ToolError>,
        _duration_ms: u64,
    ) {
    }
}
