//! Cache key derivation and freshness rules

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::CacheEntry;

/// Versioned namespace shared by every cache key.
///
/// Bump the version segment when a cached response shape changes incompatibly;
/// entries written under the old prefix are then never read again.
pub const CACHE_PREFIX: &str = "cryptospark_cache_v1_";

/// How long an entry is preferred over the network
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// Query parameters for one request
///
/// Keys are kept sorted, so the same logical parameter set always serializes the
/// same way no matter the insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, Value>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value for `key`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs in the form sent on the query string
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }

    /// Canonical JSON object with sorted keys
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Decides cache keys and how long entries stay fresh
#[derive(Debug, Clone)]
pub struct CachePolicy {
    prefix: String,
    ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            prefix: CACHE_PREFIX.to_string(),
            ttl: DEFAULT_TTL,
        }
    }
}

impl CachePolicy {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    /// Replaces the namespace prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key for `endpoint` called with `params`
    ///
    /// Format: `{prefix}{endpoint}_{sorted params as JSON}`.
    pub fn key_for(&self, endpoint: &str, params: &QueryParams) -> String {
        format!("{}{}_{}", self.prefix, endpoint, params.canonical_json())
    }

    /// Whether an entry written at `entry.timestamp` is still fresh at `now_millis`
    pub fn is_fresh<T>(&self, entry: &CacheEntry<T>, now_millis: i64) -> bool {
        let ttl_millis = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        now_millis.saturating_sub(entry.timestamp) < ttl_millis
    }
}
