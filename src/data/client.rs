//! Caching HTTP client for the CoinGecko API
//!
//! Every request goes through the same pipeline: a fresh cache entry wins
//! outright, otherwise the network is tried once, and if that fails any cached
//! entry of any age is served instead of the error.

use reqwest::{header, Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::cache::{CacheManager, CachePolicy, QueryParams};
use crate::config::ClientConfig;

/// Errors surfaced when a request fails and nothing is cached for it
#[derive(Debug, Error)]
pub enum ApiError {
    /// Upstream answered 429 Too Many Requests
    #[error("API Rate Limit Exceeded. Please wait a minute before retrying.")]
    RateLimited,

    /// The upstream could not be reached at all
    #[error("Network Error. Please check your internet connection.")]
    Network(#[source] reqwest::Error),

    /// Upstream answered with another non-success status
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request argument was rejected before sending
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Where a returned payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// A cache entry younger than the TTL
    FreshCache,
    /// A live network response
    Network,
    /// An expired cache entry served because the network failed
    StaleCache,
}

/// A payload together with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub source: DataSource,
}

/// Client that fetches API responses through the local cache
#[derive(Debug, Clone)]
pub struct FetchClient {
    http_client: Client,
    base_url: String,
    cache: CacheManager,
    policy: CachePolicy,
}

impl FetchClient {
    /// Creates a client for `config` storing responses in `cache`
    pub fn new(config: ClientConfig, cache: CacheManager) -> Result<Self, ApiError> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http_client: builder.build()?,
            base_url: config.base_url,
            cache,
            policy: CachePolicy::new(config.ttl),
        })
    }

    /// Creates a client with a custom HTTP client
    pub fn with_client(http_client: Client, config: ClientConfig, cache: CacheManager) -> Self {
        Self {
            http_client,
            base_url: config.base_url,
            cache,
            policy: CachePolicy::new(config.ttl),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Fetches `endpoint` with `params`, returning only the payload
    pub async fn fetch<T>(&self, endpoint: &str, params: &QueryParams) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.fetch_with_source(endpoint, params)
            .await
            .map(|fetched| fetched.data)
    }

    /// Fetches `endpoint` with `params`
    ///
    /// # Behavior
    /// - Returns a fresh cache entry without touching the network
    /// - Otherwise makes exactly one request and caches a successful response
    /// - On request failure, returns the cached entry regardless of age
    /// - Returns the classified error only if nothing is cached for the request
    pub async fn fetch_with_source<T>(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<Fetched<T>, ApiError>
    where
        T: Serialize + DeserializeOwned,
    {
        let cache_key = self.policy.key_for(endpoint, params);

        if let Some(entry) = self.cache.get::<T>(&cache_key) {
            if self.policy.is_fresh(&entry, self.cache.now_millis()) {
                debug!(key = %cache_key, "Serving fresh cached response");
                return Ok(Fetched {
                    data: entry.data,
                    source: DataSource::FreshCache,
                });
            }
        }

        match self.fetch_remote::<T>(endpoint, params).await {
            Ok(data) => {
                self.cache.set(&cache_key, &data);
                Ok(Fetched {
                    data,
                    source: DataSource::Network,
                })
            }
            Err(api_error) => self.stale_fallback(endpoint, &cache_key, api_error),
        }
    }

    /// Second stage: swap a request failure for any cached entry
    fn stale_fallback<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        cache_key: &str,
        api_error: ApiError,
    ) -> Result<Fetched<T>, ApiError> {
        match self.cache.get::<T>(cache_key) {
            Some(entry) => {
                warn!(endpoint, error = %api_error, "Serving stale data");
                Ok(Fetched {
                    data: entry.data,
                    source: DataSource::StaleCache,
                })
            }
            None => {
                error!(endpoint, error = %api_error, "Request failed with no cached data");
                Err(api_error)
            }
        }
    }

    /// Performs one GET against the upstream API
    async fn fetch_remote<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "Requesting");

        let response = self
            .http_client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .query(&params.to_query())
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Separates "could not reach the server" from other transport failures
fn classify_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_connect() || e.is_timeout() {
        ApiError::Network(e)
    } else {
        ApiError::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, MemoryStore};
    use serde::Deserialize;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{header as header_matcher, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        gecko_says: String,
    }

    struct Harness {
        client: FetchClient,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn harness(base_url: &str) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = CacheManager::with_clock(store.clone(), clock.clone());
        let config = ClientConfig::default().with_base_url(base_url);
        let client = FetchClient::new(config, cache).expect("client should build");
        Harness {
            client,
            store,
            clock,
        }
    }

    fn ping_body() -> serde_json::Value {
        serde_json::json!({ "gecko_says": "(V3) To the Moon!" })
    }

    #[tokio::test]
    async fn test_network_response_is_cached_and_reused() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(query_param("lang", "en"))
            .and(header_matcher("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ping_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let h = harness(&mock_server.uri());
        let params = QueryParams::new().with("lang", "en");

        let first: Fetched<Ping> = h.client.fetch_with_source("/ping", &params).await.unwrap();
        h.clock.advance(Duration::from_secs(10));
        let second: Fetched<Ping> = h.client.fetch_with_source("/ping", &params).await.unwrap();

        assert_eq!(first.source, DataSource::Network);
        assert_eq!(second.source, DataSource::FreshCache);
        assert_eq!(first.data, second.data);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_refetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ping_body()))
            .expect(2)
            .mount(&mock_server)
            .await;

        let h = harness(&mock_server.uri());
        let params = QueryParams::new();

        let _: Ping = h.client.fetch("/ping", &params).await.unwrap();
        h.clock.advance(Duration::from_secs(120));
        let refetched: Fetched<Ping> = h.client.fetch_with_source("/ping", &params).await.unwrap();

        assert_eq!(refetched.source, DataSource::Network);
        let key = h.client.policy().key_for("/ping", &params);
        let entry = h.client.cache().get::<Ping>(&key).unwrap();
        assert_eq!(entry.timestamp, 1_700_000_120_000);
    }

    #[tokio::test]
    async fn test_server_error_without_cache_keeps_status_and_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock_server)
            .await;

        let h = harness(&mock_server.uri());
        let err = h
            .client
            .fetch::<Ping>("/ping", &QueryParams::new())
            .await
            .unwrap_err();

        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_without_cache() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let h = harness(&mock_server.uri());
        let err = h
            .client
            .fetch::<Ping>("/ping", &QueryParams::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::RateLimited));
        assert_eq!(
            err.to_string(),
            "API Rate Limit Exceeded. Please wait a minute before retrying."
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let h = harness(&mock_server.uri());
        let err = h
            .client
            .fetch::<Ping>("/ping", &QueryParams::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Decode(_)));
        assert!(h.store.is_empty(), "Failed responses must not be cached");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Nothing listens on the discard port locally
        let h = harness("http://127.0.0.1:9");
        let err = h
            .client
            .fetch::<Ping>("/ping", &QueryParams::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
        assert_eq!(
            err.to_string(),
            "Network Error. Please check your internet connection."
        );
    }

    #[tokio::test]
    async fn test_stale_entry_served_when_unreachable() {
        let h = harness("http://127.0.0.1:9");
        let params = QueryParams::new();
        let key = h.client.policy().key_for("/ping", &params);
        let cached = Ping {
            gecko_says: "old news".to_string(),
        };
        h.client.cache().set(&key, &cached);
        h.clock.advance(Duration::from_secs(3600));

        let fetched: Fetched<Ping> = h.client.fetch_with_source("/ping", &params).await.unwrap();

        assert_eq!(fetched.source, DataSource::StaleCache);
        assert_eq!(fetched.data, cached);
    }
}
