//! REST market data adapter
//!
//! Queries a blockchain-analytics backend over HTTP:
//! - `GET {base}/prices/{assetId}`
//! - `GET {base}/pools/{poolId}` (404 means the pool is unknown)
//! - `GET {base}/pools`
//! - `GET {base}/pools/{poolId}/spot-price?coinIn=..&coinOut=..&withFees=..`
//!
//! Responses are cached in memory for a short TTL so repeated questions
//! about the same pool do not hammer the backend.

use super::{MarketDataError, MarketDataProvider, Pool, TokenPrice};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache entry for a backend response
struct CacheEntry {
    body: Value,
    expires_at: Instant,
}

/// HTTP adapter for the analytics backend
pub struct HttpMarketData {
    client: Client,
    base_url: String,
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    cache_ttl: Duration,
}

impl HttpMarketData {
    /// Create a new adapter with a 30 second cache
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, Duration::from_secs(30))
    }

    /// Create with a preconfigured client and custom cache TTL
    pub fn with_client(client: Client, base_url: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl,
        }
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Generate a cache key for a request path
    fn cache_key(path: &str) -> String {
        blake3::hash(path.as_bytes()).to_hex().to_string()
    }

    /// GET a path and return its JSON body, or `None` on 404
    async fn fetch(&self, path: &str) -> Result<Option<Value>, MarketDataError> {
        let key = Self::cache_key(path);
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.expires_at > Instant::now() {
                    tracing::debug!(path = path, "Market data cache hit");
                    return Ok(Some(entry.body.clone()));
                }
            }
        }

        let start = Instant::now();
        let response = self.client.get(self.build_url(path)).send().await?;
        let status = response.status();

        tracing::debug!(
            path = path,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Market data request completed"
        );

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MarketDataError::Decode(e.to_string()))?;

        if !self.cache_ttl.is_zero() {
            let now = Instant::now();
            let mut cache = self.cache.write().await;
            cache.retain(|_, entry| entry.expires_at > now);
            cache.insert(
                key,
                CacheEntry {
                    body: body.clone(),
                    expires_at: now + self.cache_ttl,
                },
            );
        }

        Ok(Some(body))
    }

    async fn fetch_required<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
    ) -> Result<T, MarketDataError> {
        let body = self
            .fetch(path)
            .await?
            .ok_or_else(|| MarketDataError::NotFound(what.to_string()))?;
        decode(body)
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, MarketDataError> {
    serde_json::from_value(body).map_err(|e| MarketDataError::Decode(e.to_string()))
}

/// Percent-encode a path segment or query value (coin types contain `::`)
fn encode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// Spot price response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotPriceResponse {
    spot_price: f64,
}

#[async_trait]
impl MarketDataProvider for HttpMarketData {
    async fn get_token_price(&self, asset_id: &str) -> Result<TokenPrice, MarketDataError> {
        let path = format!("/prices/{}", encode(asset_id));
        self.fetch_required(&path, &format!("price for {}", asset_id))
            .await
    }

    async fn get_pool(&self, pool_id: &str) -> Result<Option<Pool>, MarketDataError> {
        let path = format!("/pools/{}", encode(pool_id));
        match self.fetch(&path).await? {
            Some(body) => decode(body).map(Some),
            None => Ok(None),
        }
    }

    async fn get_all_pools(&self) -> Result<Vec<Pool>, MarketDataError> {
        match self.fetch("/pools").await? {
            Some(body) => decode(body),
            None => Ok(Vec::new()),
        }
    }

    async fn get_spot_price(
        &self,
        pool_id: &str,
        coin_in: &str,
        coin_out: &str,
        with_fees: bool,
    ) -> Result<f64, MarketDataError> {
        let path = format!(
            "/pools/{}/spot-price?coinIn={}&coinOut={}&withFees={}",
            encode(pool_id),
            encode(coin_in),
            encode(coin_out),
            with_fees
        );
        let response: SpotPriceResponse = self
            .fetch_required(&path, &format!("pool {}", pool_id))
            .await?;
        Ok(response.spot_price)
    }

    fn name(&self) -> &'static str {
        "HttpMarketData"
    }
}

impl Clone for HttpMarketData {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            cache: Arc::clone(&self.cache),
            cache_ttl: self.cache_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned responses by exact request path; unknown paths get 404.
    /// Returns the base URL and a counter of requests served.
    async fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("");
                let (status, body) = routes
                    .iter()
                    .find(|(route, _, _)| *route == path)
                    .map(|(_, status, body)| (*status, *body))
                    .unwrap_or((404, ""));

                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{}/api", addr), hits)
    }

    fn local_provider(base: String, ttl: Duration) -> HttpMarketData {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpMarketData::with_client(client, base, ttl)
    }

    const POOL_BODY: &str = r#"{"id":"0xpool","tokens":["0x2::sui::SUI","0xdba3::usdc::USDC"],"reserves":[1000.0,850.0],"fee":0.003,"tvl":1700.0,"apr":12.5}"#;

    #[tokio::test]
    async fn test_unknown_pool_is_none() {
        let (base, hits) = serve(vec![]).await;
        let provider = local_provider(base, Duration::from_secs(30));

        let pool = provider.get_pool("0xmissing").await;
        assert_eq!(tokio_test::assert_ok!(pool), None);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_price_is_not_found() {
        let (base, _) = serve(vec![]).await;
        let provider = local_provider(base, Duration::from_secs(30));

        let err = tokio_test::assert_err!(provider.get_token_price("0x2::sui::SUI").await);
        assert!(matches!(err, MarketDataError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let (base, _) = serve(vec![("/api/pools", 500, "backend down")]).await;
        let provider = local_provider(base, Duration::from_secs(30));

        match provider.get_all_pools().await {
            Err(MarketDataError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "backend down");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_repeat_request_served_from_cache() {
        let (base, hits) = serve(vec![("/api/pools/0xpool", 200, POOL_BODY)]).await;
        let provider = local_provider(base, Duration::from_secs(30));

        let first = provider.get_pool("0xpool").await.unwrap().unwrap();
        let second = provider.get_pool("0xpool").await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.apr, 12.5);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let (base, hits) = serve(vec![("/api/pools/0xpool", 200, POOL_BODY)]).await;
        let provider = local_provider(base, Duration::ZERO);

        provider.get_pool("0xpool").await.unwrap();
        provider.get_pool("0xpool").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_pruned_on_write() {
        let (base, _) = serve(vec![
            ("/api/pools/0xpool", 200, POOL_BODY),
            ("/api/pools", 200, "[]"),
        ])
        .await;
        let provider = local_provider(base, Duration::from_millis(50));

        provider.get_pool("0xpool").await.unwrap();
        assert_eq!(provider.cache.read().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        provider.get_all_pools().await.unwrap();

        let cache = provider.cache.read().await;
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key(&HttpMarketData::cache_key("/pools")));
    }

    #[test]
    fn test_cache_key_deterministic() {
        let key1 = HttpMarketData::cache_key("/pools/0xabc");
        let key2 = HttpMarketData::cache_key("/pools/0xabc");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_cache_key_different_for_different_paths() {
        let key1 = HttpMarketData::cache_key("/pools/0xabc");
        let key2 = HttpMarketData::cache_key("/pools/0xdef");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = HttpMarketData::new("https://analytics.example/api/");
        assert_eq!(
            provider.build_url("/pools"),
            "https://analytics.example/api/pools"
        );
    }

    #[test]
    fn test_coin_types_are_encoded() {
        assert_eq!(encode("0x2::sui::SUI"), "0x2%3A%3Asui%3A%3ASUI");
    }

    #[test]
    fn test_decode_spot_price() {
        let parsed: SpotPriceResponse =
            decode(serde_json::json!({ "spotPrice": 0.8125 })).unwrap();
        assert_eq!(parsed.spot_price, 0.8125);
    }
}
