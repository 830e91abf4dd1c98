//! Market data tools
//!
//! Thin adapters binding tool contracts to `MarketDataProvider` calls.
//! Asset-reference arguments arrive already resolved to canonical ids.

use super::types::{OutputShape, ParameterKind, ParameterSpec, ToolArgs, ToolDefinition};
use super::{
    ToolHandler, TOOL_ALL_POOLS, TOOL_POOL_INFO, TOOL_SPOT_PRICE, TOOL_TOKEN_PRICE,
    TOOL_TOKEN_PRICES, TOOL_TOP_POOLS,
};
use crate::error::ToolError;
use crate::market::{MarketDataError, MarketDataProvider, Pool};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Computation(e.to_string()))
}

/// Price of a single asset
pub struct TokenPriceTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl TokenPriceTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolHandler for TokenPriceTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_TOKEN_PRICE,
            "Current USD price of one token, with its price 24h ago and the 24h change",
            OutputShape::PricedAsset,
        )
        .param(
            ParameterSpec::required("symbol", ParameterKind::String, "Token symbol, e.g. SUI")
                .asset_reference(),
        )
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let asset_id = args.str("symbol")?;
        let price = self.provider.get_token_price(asset_id).await?;
        to_value(&price)
    }
}

/// Prices of several assets, keyed by canonical id
pub struct TokenPricesTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl TokenPricesTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolHandler for TokenPricesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_TOKEN_PRICES,
            "Current USD prices of several tokens at once",
            OutputShape::PricedAssetMap,
        )
        .param(
            ParameterSpec::required(
                "symbols",
                ParameterKind::StringList,
                "Token symbols, e.g. [\"SUI\", \"USDC\"]",
            )
            .asset_reference(),
        )
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let asset_ids = args.string_list("symbols")?;
        if asset_ids.is_empty() {
            return Err(ToolError::InvalidArgument(
                "'symbols' must name at least one token".to_string(),
            ));
        }

        let mut prices = Map::new();
        for asset_id in asset_ids {
            let price = self.provider.get_token_price(asset_id).await?;
            prices.insert(asset_id.clone(), to_value(&price)?);
        }
        Ok(Value::Object(prices))
    }
}

/// Snapshot of one pool
pub struct PoolInfoTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl PoolInfoTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolHandler for PoolInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_POOL_INFO,
            "Tokens, reserves, fee, TVL and APR of a liquidity pool",
            OutputShape::PoolSnapshot,
        )
        .param(ParameterSpec::required(
            "pool_id",
            ParameterKind::String,
            "Pool object id",
        ))
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let pool_id = args.str("pool_id")?;
        let pool = self
            .provider
            .get_pool(pool_id)
            .await?
            .ok_or_else(|| MarketDataError::NotFound(format!("pool {}", pool_id)))?;
        to_value(&pool)
    }
}

/// Every tracked pool
pub struct AllPoolsTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl AllPoolsTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolHandler for AllPoolsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_ALL_POOLS,
            "All liquidity pools tracked by the analytics backend",
            OutputShape::PoolList,
        )
    }

    async fn invoke(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
        let pools = self.provider.get_all_pools().await?;
        to_value(&pools)
    }
}

/// Pools ranked by TVL or APR
pub struct TopPoolsTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl TopPoolsTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    fn rank(mut pools: Vec<Pool>, sort_by: &str, limit: usize) -> Result<Vec<Pool>, ToolError> {
        let key: fn(&Pool) -> f64 = match sort_by.to_lowercase().as_str() {
            "tvl" => |p: &Pool| p.tvl,
            "apr" => |p: &Pool| p.apr,
            other => {
                return Err(ToolError::InvalidArgument(format!(
                    "Unsupported sort_by '{}'. Supported: tvl, apr",
                    other
                )))
            }
        };
        pools.sort_by(|a, b| key(b).total_cmp(&key(a)));
        pools.truncate(limit);
        Ok(pools)
    }
}

#[async_trait]
impl ToolHandler for TopPoolsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_TOP_POOLS,
            "Largest or highest-yielding pools, ranked in descending order",
            OutputShape::PoolList,
        )
        .param(
            ParameterSpec::optional("limit", ParameterKind::Integer, "How many pools to return")
                .with_default(json!(5)),
        )
        .param(
            ParameterSpec::optional("sort_by", ParameterKind::String, "Ranking key: tvl or apr")
                .with_default(json!("tvl")),
        )
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let limit = args.integer("limit")?;
        if limit < 1 {
            return Err(ToolError::InvalidArgument(
                "'limit' must be at least 1".to_string(),
            ));
        }
        let sort_by = args.str("sort_by")?;
        let pools = self.provider.get_all_pools().await?;
        let ranked = Self::rank(pools, sort_by, limit as usize)?;
        to_value(&ranked)
    }
}

/// Spot price between two coins of a pool
pub struct SpotPriceTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl SpotPriceTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolHandler for SpotPriceTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_SPOT_PRICE,
            "Spot swap rate inside a pool: how much coin_out one coin_in buys",
            OutputShape::SpotPrice,
        )
        .param(ParameterSpec::required(
            "pool_id",
            ParameterKind::String,
            "Pool object id",
        ))
        .param(
            ParameterSpec::required("coin_in", ParameterKind::String, "Symbol of the coin sold")
                .asset_reference(),
        )
        .param(
            ParameterSpec::required("coin_out", ParameterKind::String, "Symbol of the coin bought")
                .asset_reference(),
        )
        .param(
            ParameterSpec::optional("with_fees", ParameterKind::Boolean, "Include the pool fee")
                .with_default(json!(true)),
        )
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let price = self
            .provider
            .get_spot_price(
                args.str("pool_id")?,
                args.str("coin_in")?,
                args.str("coin_out")?,
                args.boolean("with_fees")?,
            )
            .await?;
        Ok(json!(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{StaticMarketData, TokenPrice};
    use crate::tokens::coin_types::{SUI, USDC};
    use crate::tools::ArgValue;

    fn demo() -> Arc<dyn MarketDataProvider> {
        Arc::new(StaticMarketData::demo())
    }

    #[tokio::test]
    async fn test_token_prices_keyed_by_id() {
        let tool = TokenPricesTool::new(demo());
        let args = ToolArgs::new().with(
            "symbols",
            ArgValue::StringList(vec![SUI.to_string(), USDC.to_string()]),
        );
        let output = tool.invoke(&args).await.unwrap();
        assert_eq!(output[SUI]["current"], json!(1.23));
        assert_eq!(output[USDC]["current"], json!(1.0));
    }

    #[tokio::test]
    async fn test_pool_info_not_found() {
        let tool = PoolInfoTool::new(demo());
        let args = ToolArgs::new().with("pool_id", ArgValue::String("0xmissing".into()));
        let err = tool.invoke(&args).await.unwrap_err();
        assert!(matches!(err, ToolError::MarketData(MarketDataError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_top_pools_by_apr() {
        let tool = TopPoolsTool::new(demo());
        let args = ToolArgs::new()
            .with("limit", ArgValue::Integer(2))
            .with("sort_by", ArgValue::String("apr".into()));
        let output = tool.invoke(&args).await.unwrap();
        let pools = output.as_array().unwrap();
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0]["apr"], json!(31.06));
        assert_eq!(pools[1]["apr"], json!(18.42));
    }

    #[tokio::test]
    async fn test_top_pools_rejects_unknown_key() {
        let tool = TopPoolsTool::new(demo());
        let args = ToolArgs::new()
            .with("limit", ArgValue::Integer(2))
            .with("sort_by", ArgValue::String("volume".into()));
        assert!(matches!(
            tool.invoke(&args).await,
            Err(ToolError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_token_price_output_shape() {
        let provider = StaticMarketData::new().with_price(
            SUI,
            TokenPrice {
                current: 1.23,
                previous: 1.2,
                last_updated: 0,
                price_change_24h: 2.5,
            },
        );
        let tool = TokenPriceTool::new(Arc::new(provider));
        let args = ToolArgs::new().with("symbol", ArgValue::String(SUI.into()));
        let output = tool.invoke(&args).await.unwrap();
        assert_eq!(
            output,
            json!({"current": 1.23, "previous": 1.2, "lastUpdated": 0, "priceChange24h": 2.5})
        );
    }
}
