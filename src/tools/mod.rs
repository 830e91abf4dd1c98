//! Tool registry
//!
//! A static catalog of the operations a plan may invoke. Each entry pairs a
//! `ToolDefinition` (name, parameters, output shape) with the handler bound
//! to it. The registry is populated once at startup and read-only afterward.

mod calc;
mod market;
mod types;

use crate::error::{QueryError, RegistryError, ToolError};
use crate::market::MarketDataProvider;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub use calc::{AprToApyTool, ApyToAprTool, ImpermanentLossTool};
pub use market::{
    AllPoolsTool, PoolInfoTool, SpotPriceTool, TokenPriceTool, TokenPricesTool, TopPoolsTool,
};
pub use types::{
    ArgValue, OutputShape, ParameterKind, ParameterSpec, ToolArgs, ToolDefinition,
};

pub const TOOL_TOKEN_PRICE: &str = "get_token_price";
pub const TOOL_TOKEN_PRICES: &str = "get_token_prices";
pub const TOOL_POOL_INFO: &str = "get_pool_info";
pub const TOOL_ALL_POOLS: &str = "get_all_pools";
pub const TOOL_TOP_POOLS: &str = "get_top_pools";
pub const TOOL_SPOT_PRICE: &str = "get_spot_price";
pub const TOOL_APR_TO_APY: &str = "apr_to_apy";
pub const TOOL_APY_TO_APR: &str = "apy_to_apr";
pub const TOOL_IMPERMANENT_LOSS: &str = "impermanent_loss";

/// Implementation bound to a tool definition
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The tool's contract
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with validated, ordered arguments
    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError>;
}

/// A definition together with its implementation
pub struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    pub async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        self.handler.invoke(args).await
    }
}

/// Name-keyed tool catalog, iterated in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its definition's name. Names are unique.
    pub fn register<T>(&mut self, handler: T) -> Result<(), RegistryError>
    where
        T: ToolHandler + 'static,
    {
        self.register_arc(Arc::new(handler))
    }

    pub fn register_arc(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), RegistryError> {
        let definition = handler.definition();
        if self.index.contains_key(definition.name) {
            return Err(RegistryError::DuplicateTool(definition.name.to_string()));
        }
        tracing::debug!(tool = definition.name, "Registered tool");
        self.index.insert(definition.name, self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            handler,
        });
        Ok(())
    }

    /// Find a tool by name
    pub fn lookup(&self, name: &str) -> Result<&RegisteredTool, QueryError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| QueryError::UnknownTool(name.to_string()))
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().map(|t| &t.definition)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Build the full catalog bound to a market data provider
pub fn default_registry(
    provider: Arc<dyn MarketDataProvider>,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(TokenPriceTool::new(provider.clone()))?;
    registry.register(TokenPricesTool::new(provider.clone()))?;
    registry.register(PoolInfoTool::new(provider.clone()))?;
    registry.register(AllPoolsTool::new(provider.clone()))?;
    registry.register(TopPoolsTool::new(provider.clone()))?;
    registry.register(SpotPriceTool::new(provider))?;
    registry.register(AprToApyTool)?;
    registry.register(ApyToAprTool)?;
    registry.register(ImpermanentLossTool)?;
    Ok(registry)
}
