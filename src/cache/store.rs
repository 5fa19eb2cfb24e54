//! Raw key/value stores backing the cache
//!
//! A store holds opaque strings under string keys and enforces a byte quota, the
//! way browser local storage does. [`FileStore`] persists everything in a single
//! JSON document under the XDG cache directory; [`MemoryStore`] keeps entries in
//! process and is what tests inject.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use directories::ProjectDirs;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Default storage quota (5 MiB), in the range browsers give an origin
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Name of the backing file inside the cache directory
const STORAGE_FILE: &str = "storage.json";

/// Errors raised by a store write
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would push the store past its quota
    #[error("Storage quota exceeded: {needed} bytes needed, quota is {quota} bytes")]
    QuotaExceeded { needed: usize, quota: usize },

    /// Reading or writing the backing file failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The store contents could not be encoded
    #[error("Failed to serialize storage: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A string key/value store with a fixed capacity
///
/// Every operation touches a single key (or, for `clear`, the whole store) and is
/// atomic from the caller's point of view.
pub trait CacheStore: Send + Sync {
    /// Returns the raw value stored under `key`
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value
    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Deletes the value under `key`, if any
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Deletes every entry
    fn clear(&self) -> Result<(), StoreError>;
}

/// Bytes the store would hold after writing `value` under `key`
fn projected_usage<'a>(
    entries: impl Iterator<Item = (&'a String, &'a String)>,
    key: &str,
    value: &str,
) -> usize {
    let others: usize = entries
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
    others + key.len() + value.len()
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Creates an empty store without a quota
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that rejects writes beyond `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(quota) = self.quota_bytes {
            let needed = projected_usage(entries.iter(), key, &value);
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

/// Store persisted as one JSON document on disk
///
/// The document is loaded on first use. Every change re-reads it first, so keys
/// written by another process in the meantime survive, and then rewrites it
/// through a uniquely named temporary file and a rename, so a crash never leaves
/// a half-written store. A document that cannot be parsed is treated as an
/// empty store.
#[derive(Debug)]
pub struct FileStore {
    /// Path of the backing JSON document
    path: PathBuf,
    quota_bytes: usize,
    /// Loaded lazily; `None` until the first operation
    entries: Mutex<Option<BTreeMap<String, String>>>,
}

impl FileStore {
    /// Creates a FileStore in the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/cryptospark/` on Linux, or the equivalent path on other platforms.
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "cryptospark")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a FileStore in a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            path: dir.join(STORAGE_FILE),
            quota_bytes: DEFAULT_QUOTA_BYTES,
            entries: Mutex::new(None),
        }
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> R {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = guard.get_or_insert_with(|| load_entries(&self.path));
        f(entries)
    }

    /// Like `with_entries`, but starts from the document as it is on disk now
    fn with_reloaded_entries<R>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> R {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = guard.insert(load_entries(&self.path));
        f(entries)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, entries)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read cache storage, starting empty");
            return BTreeMap::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cache storage is corrupt, starting empty");
            BTreeMap::new()
        }
    }
}

impl CacheStore for FileStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.with_reloaded_entries(|entries| {
            let needed = projected_usage(entries.iter(), key, &value);
            if needed > self.quota_bytes {
                return Err(StoreError::QuotaExceeded {
                    needed,
                    quota: self.quota_bytes,
                });
            }

            let previous = entries.insert(key.to_string(), value);
            if let Err(e) = self.persist(entries) {
                // Keep memory in step with what is on disk
                match previous {
                    Some(old) => entries.insert(key.to_string(), old),
                    None => entries.remove(key),
                };
                return Err(e);
            }
            debug!(key, bytes = needed, "Persisted cache entry");
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_reloaded_entries(|entries| {
            if entries.remove(key).is_some() {
                self.persist(entries)?;
            }
            Ok(())
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            entries.clear();
            match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}
