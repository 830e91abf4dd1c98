//! Audit log interceptor
//!
//! Appends every LLM call and tool call to a JSONL file for debugging and
//! offline review of what the model asked for.

use super::{CallObserver, LlmCallContext, ToolCallContext};
use crate::error::ToolError;
use crate::llm::LlmError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const PROMPT_PREVIEW_CHARS: usize = 500;
const RESULT_PREVIEW_CHARS: usize = 1000;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    query_id: String,
    tool_name: Option<String>,
    model: Option<String>,
    args: Value,
    result: Option<Value>,
    error: Option<String>,
    duration_ms: u64,
    status: &'static str,
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Observer that logs all calls to a file
pub struct AuditLogInterceptor {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLogInterceptor {
    /// Create a new audit log interceptor
    ///
    /// # Arguments
    /// * `log_path` - Path to the audit log file (JSONL format)
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter::new(log_path.into()))),
        }
    }

    async fn append(&self, entry: AuditEntry) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

#[async_trait]
impl CallObserver for AuditLogInterceptor {
    async fn on_llm_call_complete(
        &self,
        context: &LlmCallContext,
        result: &Result<String, LlmError>,
        duration_ms: u64,
    ) {
        let (result_value, error, status) = match result {
            Ok(text) => (
                Some(Value::String(truncate(text, RESULT_PREVIEW_CHARS))),
                None,
                "success",
            ),
            Err(e) => (None, Some(e.to_string()), "error"),
        };

        self.append(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "llm_call_complete",
            query_id: context.query_id.clone(),
            tool_name: None,
            model: Some(context.model.clone()),
            args: serde_json::json!({
                "prompt_preview": truncate(&context.prompt, PROMPT_PREVIEW_CHARS)
            }),
            result: result_value,
            error,
            duration_ms,
            status,
        })
        .await;
    }

    async fn on_tool_call_complete(
        &self,
        context: &ToolCallContext,
        result: &Result<Value, ToolError>,
        duration_ms: u64,
    ) {
        let (result_value, error, status) = match result {
            Ok(v) => (Some(truncate_value(v)), None, "success"),
            Err(e) => (None, Some(e.to_string()), "error"),
        };

        self.append(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "tool_call_complete",
            query_id: context.query_id.clone(),
            tool_name: Some(context.tool_name.clone()),
            model: None,
            args: context.args.clone(),
            result: result_value,
            error,
            duration_ms,
            status,
        })
        .await;
    }
}

/// Truncate on a character boundary
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}... [truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

/// Large results (pool lists) are logged as a truncated string
fn truncate_value(result: &Value) -> Value {
    let s = serde_json::to_string(result).unwrap_or_default();
    if s.chars().count() > RESULT_PREVIEW_CHARS {
        Value::String(truncate(&s, RESULT_PREVIEW_CHARS))
    } else {
        result.clone()
    }
}
