//! Cache module for storing API responses in a local key/value store
//!
//! Responses are wrapped in a [`CacheEntry`] carrying the epoch-millisecond time
//! they were written. Freshness is decided at read time by [`CachePolicy`]; expired
//! entries are kept so the fetch client can fall back to them when the upstream
//! API is unavailable.

mod clock;
mod manager;
mod policy;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{CacheEntry, CacheManager};
pub use policy::{CachePolicy, QueryParams, CACHE_PREFIX, DEFAULT_TTL};
pub use store::{CacheStore, FileStore, MemoryStore, StoreError, DEFAULT_QUOTA_BYTES};
