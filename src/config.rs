//! Client configuration
//!
//! Everything tunable about talking to the upstream API lives here. The CLI
//! builds one of these from its flags and environment.

use std::time::Duration;

use crate::cache::DEFAULT_TTL;

/// Base URL of the CoinGecko v3 API
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// User agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("cryptospark/", env!("CARGO_PKG_VERSION"));

/// Configuration for [`FetchClient`](crate::data::FetchClient)
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Upstream API root, without a trailing slash
    pub base_url: String,
    /// How long a cached response is preferred over the network
    pub ttl: Duration,
    /// Request timeout; `None` leaves it to the transport
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ttl: DEFAULT_TTL,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Points the client at a different API root (e.g. a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.coingecko.com/api/v3");
        assert_eq!(config.ttl, Duration::from_secs(120));
        assert!(config.timeout.is_none());
        assert!(config.user_agent.starts_with("cryptospark/"));
    }

    #[test]
    fn test_client_config_custom() {
        let config = ClientConfig::default()
            .with_base_url("http://localhost:8080/")
            .with_ttl(Duration::from_secs(5))
            .with_timeout(Duration::from_secs(30))
            .with_user_agent("test-agent");

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.ttl, Duration::from_secs(5));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.user_agent, "test-agent");
    }
}
