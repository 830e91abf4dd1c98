//! Error types for the DeFi query agent

use crate::llm::LlmError;
use crate::market::MarketDataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Startup-time registry failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),
}

/// Failure raised by a tool adapter while handling one call
#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Computation(String),
}

/// Query-level failures. Every variant collapses into a single error response.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Could not understand the model's plan: {0}")]
    MalformedPlan(String),

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Unknown asset symbol '{0}'")]
    UnknownSymbol(String),

    #[error("Missing required parameter '{parameter}' for tool '{tool}'")]
    MissingParameter { tool: String, parameter: String },

    #[error("Invalid value for parameter '{parameter}' of tool '{tool}': {reason}")]
    InvalidParameter {
        tool: String,
        parameter: String,
        reason: String,
    },

    #[error("Tool '{tool}' failed: {source}")]
    ToolExecutionFailure {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),
}
