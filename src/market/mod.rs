//! Market data capability
//!
//! The query core never talks to a blockchain-analytics backend directly.
//! It receives a `MarketDataProvider` at construction and calls it through
//! the registered tools. Two adapters ship with the crate:
//! - `HttpMarketData` for a REST analytics backend (with a short TTL cache)
//! - `StaticMarketData` for tests and offline runs

mod fixture;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fixture::StaticMarketData;
pub use http::HttpMarketData;

/// Price snapshot for a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    /// Current USD price
    pub current: f64,
    /// USD price 24 hours ago
    pub previous: f64,
    /// Unix timestamp (milliseconds) of the last update
    #[serde(default)]
    pub last_updated: i64,
    /// 24h price change in percent
    #[serde(rename = "priceChange24h")]
    pub price_change_24h: f64,
}

/// Liquidity pool snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: String,
    /// Canonical coin types, aligned with `reserves`
    pub tokens: Vec<String>,
    /// Token reserves in whole units
    pub reserves: Vec<f64>,
    /// Swap fee in percent
    pub fee: f64,
    /// Total value locked (USD)
    pub tvl: f64,
    /// Annual percentage rate in percent
    pub apr: f64,
}

/// Error type for market data operations
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Data-retrieval capability the tool adapters are bound to.
///
/// Implementations may be called concurrently from independent queries, but a
/// single query awaits each call in sequence.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current and previous price for a canonical asset id
    async fn get_token_price(&self, asset_id: &str) -> Result<TokenPrice, MarketDataError>;

    /// Look up a pool by id; `Ok(None)` when the backend does not know it
    async fn get_pool(&self, pool_id: &str) -> Result<Option<Pool>, MarketDataError>;

    /// Every pool the backend tracks
    async fn get_all_pools(&self) -> Result<Vec<Pool>, MarketDataError>;

    /// Spot price of `coin_out` per unit of `coin_in` within a pool
    async fn get_spot_price(
        &self,
        pool_id: &str,
        coin_in: &str,
        coin_out: &str,
        with_fees: bool,
    ) -> Result<f64, MarketDataError>;

    /// Adapter name for logging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_price_uses_camel_case_fields() {
        let price = TokenPrice {
            current: 1.23,
            previous: 1.2,
            last_updated: 1_700_000_000_000,
            price_change_24h: 2.5,
        };
        let value = serde_json::to_value(&price).unwrap();
        assert_eq!(value["priceChange24h"], json!(2.5));
        assert_eq!(value["lastUpdated"], json!(1_700_000_000_000i64));
    }

    #[test]
    fn token_price_tolerates_missing_timestamp() {
        let price: TokenPrice = serde_json::from_value(json!({
            "current": 2.0,
            "previous": 1.0,
            "priceChange24h": 100.0
        }))
        .unwrap();
        assert_eq!(price.last_updated, 0);
    }
}
