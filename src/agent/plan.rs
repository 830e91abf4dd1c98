//! Plan interpreter
//!
//! Calls the LLM once and turns its free-form reply into a `Plan`.
//! Models wrap JSON in prose or markdown unpredictably, so extraction tries,
//! in order:
//! 1. the whole reply as JSON
//! 2. the contents of a fenced code block
//! 3. the first balanced `{ ... }` object anywhere in the text
//!
//! Anything that survives none of these, or parses without a `status`,
//! is a `MalformedPlan`.

use crate::error::QueryError;
use crate::interceptors::{CallObserver, LlmCallContext};
use crate::llm::LlmClient;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_NEEDS_INFO: &str = "Could you give me a few more details about what you want to know?";
const DEFAULT_ERROR: &str = "I can't answer that question with the available data tools.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Success,
    NeedsInfo,
    Error,
}

impl PlanStatus {
    fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect();
        match normalized.as_str() {
            "success" => Some(PlanStatus::Success),
            "needsinfo" => Some(PlanStatus::NeedsInfo),
            "error" => Some(PlanStatus::Error),
            _ => None,
        }
    }
}

/// One proposed tool invocation. Untrusted until the executor validates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub tool: String,
    pub input: Map<String, Value>,
}

/// The model's structured proposal for answering a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub status: PlanStatus,
    pub reasoning: String,
    /// Always empty unless `status` is `Success`
    pub actions: Vec<Action>,
    pub answer_template: String,
    pub request: Option<String>,
    pub error_message: Option<String>,
}

// Accepted spellings per plan field, highest priority first
const ACTIONS_KEYS: &[&str] = &["actions", "tools", "tool_calls"];
const TEMPLATE_KEYS: &[&str] = &["answerTemplate", "answer_template", "template", "answer"];
const REQUEST_KEYS: &[&str] = &["request", "question"];
const ERROR_KEYS: &[&str] = &["errorMessage", "error_message", "error", "message"];
const INPUT_KEYS: &[&str] = &["input", "params", "parameters", "arguments"];

/// First key present with a non-null value
fn first_present<'m, 'k>(
    map: &'m Map<String, Value>,
    keys: &[&'k str],
) -> Option<(&'k str, &'m Value)> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .filter(|v| !v.is_null())
            .map(|v| (*key, v))
    })
}

/// First key holding a non-blank string
fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn parse_action(index: usize, value: &Value) -> Result<Action, QueryError> {
    let malformed = |what: &str| QueryError::MalformedPlan(format!("action {} {}", index, what));

    let map = value.as_object().ok_or_else(|| malformed("is not an object"))?;
    let tool = map
        .get("tool")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("has no 'tool' name"))?;
    let mut input = Map::new();
    for key in INPUT_KEYS {
        match map.get(*key) {
            None | Some(Value::Null) => {}
            Some(Value::Object(candidate)) => {
                if input.is_empty() {
                    input = candidate.clone();
                }
            }
            Some(_) => return Err(malformed(&format!("has a non-object '{}'", key))),
        }
    }

    Ok(Action {
        tool: tool.to_string(),
        input,
    })
}

fn parse_actions(map: &Map<String, Value>) -> Result<Vec<Action>, QueryError> {
    match first_present(map, ACTIONS_KEYS) {
        None => Ok(Vec::new()),
        Some((_, Value::Array(items))) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_action(i, item))
            .collect(),
        Some((key, _)) => Err(QueryError::MalformedPlan(format!(
            "'{}' is not a list",
            key
        ))),
    }
}

/// Parse a model reply into a plan
pub fn parse_plan(text: &str) -> Result<Plan, QueryError> {
    let map = extract_json_object(text).ok_or_else(|| {
        QueryError::MalformedPlan("no JSON object found in the model response".to_string())
    })?;

    let status_text = map
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| QueryError::MalformedPlan("plan has no 'status' field".to_string()))?;
    let status = PlanStatus::parse(status_text).ok_or_else(|| {
        QueryError::MalformedPlan(format!("unknown plan status '{}'", status_text))
    })?;

    let actions = match status {
        PlanStatus::Success => parse_actions(&map)?,
        _ => {
            if let Some((_, Value::Array(dropped))) = first_present(&map, ACTIONS_KEYS) {
                if !dropped.is_empty() {
                    tracing::debug!(
                        status = ?status,
                        dropped = dropped.len(),
                        "Dropping actions from non-success plan"
                    );
                }
            }
            Vec::new()
        }
    };

    let request = first_text(&map, REQUEST_KEYS);
    let error_message = first_text(&map, ERROR_KEYS);
    let request = match status {
        PlanStatus::NeedsInfo => Some(request.unwrap_or_else(|| DEFAULT_NEEDS_INFO.to_string())),
        _ => request,
    };
    let error_message = match status {
        PlanStatus::Error => Some(error_message.unwrap_or_else(|| DEFAULT_ERROR.to_string())),
        _ => error_message,
    };

    Ok(Plan {
        status,
        reasoning: first_text(&map, &["reasoning"]).unwrap_or_default(),
        actions,
        answer_template: first_text(&map, TEMPLATE_KEYS).unwrap_or_default(),
        request,
        error_message,
    })
}

/// Find a JSON object in model output using the layered strategies
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();

    // 1. Whole reply
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Some(map);
    }

    // 2. Fenced code blocks
    for block in fenced_blocks(trimmed) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(block.trim()) {
            tracing::debug!("Parsed plan from fenced block");
            return Some(map);
        }
    }

    // 3. Balanced brace objects
    for candidate in brace_objects(trimmed) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
            tracing::debug!("Parsed plan from embedded object");
            return Some(map);
        }
    }

    None
}

/// Contents of each ``` fenced block, language tag stripped
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        // The info string runs to the end of the opening line
        let body_start = match after_fence.find('\n') {
            Some(newline) if !after_fence[..newline].contains('{') => newline + 1,
            _ => 0,
        };
        let body = &after_fence[body_start..];
        match body.find("```") {
            Some(close) => {
                blocks.push(&body[..close]);
                rest = &body[close + 3..];
            }
            None => break,
        }
    }
    blocks
}

/// Top-level `{ ... }` spans, skipping braces inside JSON strings
fn brace_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        objects.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    objects
}

/// Invokes the LLM once per query and parses its plan
pub struct PlanInterpreter<'a> {
    llm: &'a dyn LlmClient,
    observers: &'a [Arc<dyn CallObserver>],
}

impl<'a> PlanInterpreter<'a> {
    pub fn new(llm: &'a dyn LlmClient, observers: &'a [Arc<dyn CallObserver>]) -> Self {
        Self { llm, observers }
    }

    /// Single LLM call; transport failure or timeout is fatal to the query
    pub async fn interpret(&self, query_id: &str, prompt: &str) -> Result<Plan, QueryError> {
        let start = Instant::now();
        let result = self.llm.complete(prompt).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if !self.observers.is_empty() {
            let context = LlmCallContext {
                query_id: query_id.to_string(),
                model: self.llm.model().to_string(),
                prompt: prompt.to_string(),
            };
            for observer in self.observers {
                observer
                    .on_llm_call_complete(&context, &result, duration_ms)
                    .await;
            }
        }

        let text = result.map_err(|e| {
            tracing::warn!(error = %e, duration_ms = duration_ms, "LLM call failed");
            QueryError::Llm(e)
        })?;
        tracing::info!(
            model = self.llm.model(),
            duration_ms = duration_ms,
            response_chars = text.len(),
            "LLM call completed"
        );

        let plan = parse_plan(&text);
        if let Err(e) = &plan {
            tracing::warn!(error = %e, "Model response did not contain a usable plan");
        }
        plan
    }
}
