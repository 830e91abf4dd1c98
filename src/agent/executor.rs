//! Action executor
//!
//! Validates each proposed action against the registry, resolves asset
//! references, assembles typed arguments in parameter order and invokes the
//! bound tool. Execution is sequential and all-or-nothing: the first failure
//! aborts the plan and discards earlier results.

use super::plan::Action;
use crate::error::QueryError;
use crate::interceptors::{CallObserver, ToolCallContext};
use crate::tokens::SymbolTable;
use crate::tools::{OutputShape, ToolArgs, ToolDefinition, ToolRegistry};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one executed action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub tool: String,
    /// Arguments as dispatched, after resolution and defaults
    pub input: Value,
    pub output: Value,
    #[serde(skip)]
    pub shape: OutputShape,
}

pub struct ActionExecutor<'a> {
    registry: &'a ToolRegistry,
    symbols: &'a SymbolTable,
    observers: &'a [Arc<dyn CallObserver>],
}

impl<'a> ActionExecutor<'a> {
    pub fn new(
        registry: &'a ToolRegistry,
        symbols: &'a SymbolTable,
        observers: &'a [Arc<dyn CallObserver>],
    ) -> Self {
        Self {
            registry,
            symbols,
            observers,
        }
    }

    /// Validate an action and build its argument list without running it
    pub fn prepare(&self, action: &Action) -> Result<ToolArgs, QueryError> {
        let definition = self.registry.lookup(&action.tool)?.definition();
        self.build_args(definition, &action.input)
    }

    fn build_args(
        &self,
        definition: &ToolDefinition,
        input: &Map<String, Value>,
    ) -> Result<ToolArgs, QueryError> {
        let mut args = ToolArgs::new();
        for spec in &definition.parameters {
            let raw = match input.get(spec.name).filter(|v| !v.is_null()) {
                Some(value) if spec.asset_reference => self.resolve_assets(value)?,
                Some(value) => value.clone(),
                None => match &spec.default {
                    Some(default) => default.clone(),
                    None if spec.required => {
                        return Err(QueryError::MissingParameter {
                            tool: definition.name.to_string(),
                            parameter: spec.name.to_string(),
                        })
                    }
                    None => continue,
                },
            };

            let value = spec
                .kind
                .coerce(&raw)
                .map_err(|reason| QueryError::InvalidParameter {
                    tool: definition.name.to_string(),
                    parameter: spec.name.to_string(),
                    reason,
                })?;
            args.push(spec.name, value);
        }

        for extra in input.keys() {
            if !definition.parameters.iter().any(|p| p.name == extra.as_str()) {
                tracing::debug!(tool = definition.name, parameter = %extra, "Ignoring undeclared parameter");
            }
        }
        Ok(args)
    }

    /// Resolve a symbol, or each symbol of a list, to canonical ids
    fn resolve_assets(&self, value: &Value) -> Result<Value, QueryError> {
        match value {
            Value::String(symbol) => Ok(Value::String(self.resolve_symbol_or_list(symbol)?)),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(symbol) => self.symbols.resolve(symbol).map(Value::String),
                    other => Ok(other.clone()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // Left for coercion to reject
            other => Ok(other.clone()),
        }
    }

    /// A comma-separated string stays comma-separated after resolution
    fn resolve_symbol_or_list(&self, raw: &str) -> Result<String, QueryError> {
        if !raw.contains(',') {
            return self.symbols.resolve(raw);
        }
        let resolved = raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| self.symbols.resolve(part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resolved.join(","))
    }

    /// Run every action in order. Stops at the first failure.
    pub async fn execute(
        &self,
        query_id: &str,
        actions: &[Action],
    ) -> Result<Vec<ActionResult>, QueryError> {
        let mut results = Vec::with_capacity(actions.len());

        for (index, action) in actions.iter().enumerate() {
            let tool = self.registry.lookup(&action.tool)?;
            let definition = tool.definition();
            let args = self.build_args(definition, &action.input)?;
            let input = args.to_json();

            tracing::info!(tool = definition.name, index = index, args = %input, "Invoking tool");
            let start = Instant::now();
            let result = tool.invoke(&args).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            if !self.observers.is_empty() {
                let context = ToolCallContext {
                    query_id: query_id.to_string(),
                    tool_name: definition.name.to_string(),
                    args: input.clone(),
                };
                for observer in self.observers {
                    observer
                        .on_tool_call_complete(&context, &result, duration_ms)
                        .await;
                }
            }

            match result {
                Ok(output) => {
                    tracing::info!(tool = definition.name, duration_ms = duration_ms, "Tool call succeeded");
                    results.push(ActionResult {
                        tool: definition.name.to_string(),
                        input,
                        output,
                        shape: definition.output,
                    });
                }
                Err(source) => {
                    tracing::warn!(
                        tool = definition.name,
                        duration_ms = duration_ms,
                        discarded = results.len(),
                        error = %source,
                        "Tool call failed, aborting plan"
                    );
                    return Err(QueryError::ToolExecutionFailure {
                        tool: definition.name.to_string(),
                        source,
                    });
                }
            }
        }

        Ok(results)
    }
}
