//! DeFi Query Agent
//!
//! Answers free-form questions about Sui DeFi markets (token prices,
//! liquidity pools, swap rates) by:
//! - asking an LLM for a JSON plan of tool calls
//! - validating and executing that plan against a market data provider
//! - rendering the results into a formatted answer
//!
//! # Safety Model
//!
//! - The model only proposes; every action is checked against the tool registry
//! - Asset symbols are resolved through a static table before dispatch
//! - Any failure becomes a single error response, never a crash
//! - Optional audit trail of every LLM and tool call

pub mod agent;
pub mod config;
pub mod interceptors;
pub mod llm;
pub mod market;
pub mod render;
pub mod runner;
pub mod tokens;
pub mod tools;

mod error;

// Re-export commonly used types
pub use agent::{QueryAgent, QueryResponse};
pub use config::Config;
pub use error::{Error, QueryError, RegistryError, Result, ToolError};
pub use runner::AgentRunner;
