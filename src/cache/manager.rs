//! Cache manager for persisting API responses
//!
//! Provides a `CacheManager` that wraps serializable data in timestamped entries
//! on top of a [`CacheStore`], healing corrupt entries and recovering from a full
//! store by clearing it.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CacheStore, Clock, StoreError, SystemClock};

/// Wrapper stored for every cached response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached data
    pub data: T,
    /// When the data was cached, in epoch milliseconds
    pub timestamp: i64,
}

/// Reads and writes typed entries through a shared store
///
/// The manager never edits an entry in place: reads return a copy and writes
/// replace the whole entry under a key.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager").finish_non_exhaustive()
    }
}

impl CacheManager {
    /// Creates a manager over `store` using wall-clock time
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a manager with a custom time source
    ///
    /// Useful for testing expiry without waiting for it.
    pub fn with_clock(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Current time according to the manager's clock
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Reads the entry under `key`
    ///
    /// Returns `None` if nothing is stored. A value that cannot be parsed as a
    /// `CacheEntry<T>` is deleted and also reported as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = self.store.get_raw(key)?;
        match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key, error = %e, "Discarding corrupt cache entry");
                if let Err(e) = self.store.remove(key) {
                    warn!(key, error = %e, "Failed to remove corrupt cache entry");
                }
                None
            }
        }
    }

    /// Writes `data` under `key` stamped with the current time
    ///
    /// Never fails. When the store is full it is cleared entirely and the write is
    /// dropped; any other write failure is logged and dropped.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        let entry = CacheEntry {
            data,
            timestamp: self.now_millis(),
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        match self.store.set_raw(key, raw) {
            Ok(()) => debug!(key, "Cached response"),
            Err(StoreError::QuotaExceeded { needed, quota }) => {
                warn!(key, needed, quota, "Storage quota exceeded, clearing cache");
                self.clear();
            }
            Err(e) => warn!(key, error = %e, "Failed to write cache entry"),
        }
    }

    /// Removes every entry from the underlying store
    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FileStore, ManualClock, MemoryStore};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn create_test_cache() -> (CacheManager, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = CacheManager::with_clock(store.clone(), clock.clone());
        (cache, store, clock)
    }

    #[test]
    fn test_read_returns_none_for_missing_key() {
        let (cache, _store, _clock) = create_test_cache();

        let result: Option<CacheEntry<TestData>> = cache.get("nonexistent_key");

        assert!(result.is_none(), "Should return None for missing key");
    }

    #[test]
    fn test_write_then_read_keeps_data_and_timestamp() {
        let (cache, _store, clock) = create_test_cache();
        let data = TestData {
            name: "fresh".to_string(),
            value: 100,
        };

        cache.set("fresh_key", &data);
        clock.advance(Duration::from_secs(5));

        let entry: CacheEntry<TestData> = cache.get("fresh_key").expect("Should read entry");
        assert_eq!(entry.data, data);
        assert_eq!(entry.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_entry_wire_format() {
        let (cache, store, _clock) = create_test_cache();
        cache.set("k", &vec![1, 2, 3]);

        let raw = store.get_raw("k").expect("raw value");
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["timestamp"], serde_json::json!(1_700_000_000_000i64));
    }

    #[test]
    fn test_overwrite_existing_entry() {
        let (cache, _store, clock) = create_test_cache();
        let first = TestData {
            name: "first".to_string(),
            value: 1,
        };
        let second = TestData {
            name: "second".to_string(),
            value: 2,
        };

        cache.set("overwrite_key", &first);
        clock.advance(Duration::from_secs(60));
        cache.set("overwrite_key", &second);

        let entry: CacheEntry<TestData> = cache.get("overwrite_key").expect("Should read cache");
        assert_eq!(entry.data, second, "Cache should contain latest data");
        assert_eq!(entry.timestamp, 1_700_000_060_000);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_and_removed() {
        let (cache, store, _clock) = create_test_cache();
        store.set_raw("broken", "{definitely not json".to_string()).unwrap();

        let result: Option<CacheEntry<TestData>> = cache.get("broken");

        assert!(result.is_none());
        assert!(store.get_raw("broken").is_none(), "Corrupt entry should be deleted");
    }

    #[test]
    fn test_wrong_shape_is_treated_as_corrupt() {
        let (cache, store, _clock) = create_test_cache();
        store
            .set_raw("shape", r#"{"data":"text","timestamp":1}"#.to_string())
            .unwrap();

        let result: Option<CacheEntry<TestData>> = cache.get("shape");

        assert!(result.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_quota_failure_clears_store() {
        let store = Arc::new(MemoryStore::with_quota(200));
        let cache = CacheManager::new(store.clone());
        cache.set("small", &"x");
        assert_eq!(store.len(), 1);

        cache.set("large", &"y".repeat(500));

        assert!(store.is_empty(), "Quota failure should clear the whole store");
        assert!(cache.get::<String>("large").is_none());
    }

    #[test]
    fn test_file_backed_cache_roundtrip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(FileStore::with_dir(temp_dir.path().to_path_buf()));
        let cache = CacheManager::new(store);
        let data = TestData {
            name: "disk".to_string(),
            value: 7,
        };

        cache.set("disk_key", &data);

        let reopened = CacheManager::new(Arc::new(FileStore::with_dir(
            temp_dir.path().to_path_buf(),
        )));
        let entry: CacheEntry<TestData> = reopened.get("disk_key").expect("Should read cache");
        assert_eq!(entry.data, data);
    }
}
