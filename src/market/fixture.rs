//! In-memory market data
//!
//! Serves a fixed snapshot of prices and pools. Used by the test suite and
//! by `defi-query ask --offline`.

use super::{MarketDataError, MarketDataProvider, Pool, TokenPrice};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Immutable, builder-populated market snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    prices: HashMap<String, TokenPrice>,
    pools: Vec<Pool>,
    spot_prices: HashMap<(String, String, String), f64>,
    unavailable: HashSet<String>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a price for a canonical asset id
    pub fn with_price(mut self, asset_id: impl Into<String>, price: TokenPrice) -> Self {
        self.prices.insert(asset_id.into(), price);
        self
    }

    /// Add (or replace) a pool
    pub fn with_pool(mut self, pool: Pool) -> Self {
        self.pools.retain(|p| p.id != pool.id);
        self.pools.push(pool);
        self
    }

    /// Add a spot price for a pool and coin direction (fees included)
    pub fn with_spot_price(
        mut self,
        pool_id: impl Into<String>,
        coin_in: impl Into<String>,
        coin_out: impl Into<String>,
        price: f64,
    ) -> Self {
        self.spot_prices
            .insert((pool_id.into(), coin_in.into(), coin_out.into()), price);
        self
    }

    /// Make every call touching this id fail as if the backend were down
    pub fn with_unavailable(mut self, id: impl Into<String>) -> Self {
        self.unavailable.insert(id.into());
        self
    }

    /// Small snapshot of Sui markets for offline runs
    pub fn demo() -> Self {
        use crate::tokens::coin_types::{CETUS, SUI, USDC, WETH};

        let now = chrono::Utc::now().timestamp_millis();
        let price = |current: f64, previous: f64| TokenPrice {
            current,
            previous,
            last_updated: now,
            price_change_24h: (current - previous) / previous * 100.0,
        };

        Self::new()
            .with_price(SUI, price(1.23, 1.20))
            .with_price(USDC, price(1.0, 1.0))
            .with_price(WETH, price(3412.55, 3501.10))
            .with_price(CETUS, price(0.1134, 0.1089))
            .with_pool(Pool {
                id: "0x5eb2dfcdd1b15d2021328258f6d5ec081e9a0cdcfa9e13a0eaeb9b5f7505ca78".to_string(),
                tokens: vec![SUI.to_string(), USDC.to_string()],
                reserves: vec![4_182_001.5, 5_140_233.25],
                fee: 0.25,
                tvl: 10_284_095.1,
                apr: 18.42,
            })
            .with_pool(Pool {
                id: "0xa528b26eae41bcfca488a9feaa3dca614b2a1d9b9b5c78c256918ced051d4c50".to_string(),
                tokens: vec![WETH.to_string(), USDC.to_string()],
                reserves: vec![412.75, 1_408_550.0],
                fee: 0.05,
                tvl: 2_817_100.4,
                apr: 9.87,
            })
            .with_pool(Pool {
                id: "0x2e041f3fd93646dcc877f783c1f2b7fa62d30271bdef1f21ef002cebf857bded".to_string(),
                tokens: vec![CETUS.to_string(), SUI.to_string()],
                reserves: vec![9_874_120.0, 910_443.2],
                fee: 0.25,
                tvl: 2_239_800.0,
                apr: 31.06,
            })
            .with_spot_price(
                "0x5eb2dfcdd1b15d2021328258f6d5ec081e9a0cdcfa9e13a0eaeb9b5f7505ca78",
                SUI,
                USDC,
                1.229175,
            )
    }

    fn check_available(&self, id: &str) -> Result<(), MarketDataError> {
        if self.unavailable.contains(id) {
            return Err(MarketDataError::Status {
                status: 503,
                body: format!("{} temporarily unavailable", id),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    async fn get_token_price(&self, asset_id: &str) -> Result<TokenPrice, MarketDataError> {
        self.check_available(asset_id)?;
        self.prices
            .get(asset_id)
            .cloned()
            .ok_or_else(|| MarketDataError::NotFound(format!("price for {}", asset_id)))
    }

    async fn get_pool(&self, pool_id: &str) -> Result<Option<Pool>, MarketDataError> {
        self.check_available(pool_id)?;
        Ok(self.pools.iter().find(|p| p.id == pool_id).cloned())
    }

    async fn get_all_pools(&self) -> Result<Vec<Pool>, MarketDataError> {
        Ok(self.pools.clone())
    }

    async fn get_spot_price(
        &self,
        pool_id: &str,
        coin_in: &str,
        coin_out: &str,
        with_fees: bool,
    ) -> Result<f64, MarketDataError> {
        self.check_available(pool_id)?;
        let key = (
            pool_id.to_string(),
            coin_in.to_string(),
            coin_out.to_string(),
        );
        let price = self
            .spot_prices
            .get(&key)
            .copied()
            .ok_or_else(|| MarketDataError::NotFound(format!("pool {}", pool_id)))?;

        if with_fees {
            return Ok(price);
        }
        // Stored prices include the pool fee
        let fee = self
            .pools
            .iter()
            .find(|p| p.id == pool_id)
            .map(|p| p.fee)
            .unwrap_or(0.0);
        Ok(price / (1.0 - fee / 100.0))
    }

    fn name(&self) -> &'static str {
        "StaticMarketData"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::coin_types::{SUI, USDC};

    #[tokio::test]
    async fn test_demo_has_sui_price() {
        let provider = StaticMarketData::demo();
        let price = provider.get_token_price(SUI).await.unwrap();
        assert_eq!(price.current, 1.23);
        assert!((price.price_change_24h - 2.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_pool_is_none() {
        let provider = StaticMarketData::demo();
        assert!(provider.get_pool("0xdoesnotexist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_id_fails() {
        let provider = StaticMarketData::demo().with_unavailable(SUI);
        let err = provider.get_token_price(SUI).await.unwrap_err();
        assert!(matches!(err, MarketDataError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_spot_price_without_fees_is_higher() {
        let provider = StaticMarketData::demo();
        let pool = "0x5eb2dfcdd1b15d2021328258f6d5ec081e9a0cdcfa9e13a0eaeb9b5f7505ca78";
        let with = provider.get_spot_price(pool, SUI, USDC, true).await.unwrap();
        let without = provider
            .get_spot_price(pool, SUI, USDC, false)
            .await
            .unwrap();
        assert!(without > with);
    }
}
