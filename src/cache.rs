//! Package lookup cache
//!
//! Registry responses are cached per `(namespace, key)` at:
//! `~/.cache/flakedeps/<namespace>/<percent-encoded key>.json`
//!
//! The cache never makes a lookup fail: if the store cannot be read or
//! written the value is computed live and a warning is logged. Concurrent
//! lookups of the same key wait for the first one instead of fetching twice.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cannot determine cache directory. HOME environment variable not set.")]
    NoCacheDir,

    #[error("Failed to read cache entry {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write cache entry {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt cache entry {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A stored value and when it was stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedValue {
    /// Seconds since the unix epoch
    pub stored_at: u64,
    pub value: serde_json::Value,
}

/// Backing storage for `PackageCache`
pub trait CacheStore: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<CachedValue>, CacheError>;
    fn set(&self, namespace: &str, key: &str, entry: &CachedValue) -> Result<(), CacheError>;
}

/// Process-local store, used for tests and `--no-cache`
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), CachedValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<CachedValue>, CacheError> {
        let entries = lock(&self.entries);
        Ok(entries
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    fn set(&self, namespace: &str, key: &str, entry: &CachedValue) -> Result<(), CacheError> {
        let mut entries = lock(&self.entries);
        entries.insert((namespace.to_string(), key.to_string()), entry.clone());
        Ok(())
    }
}

/// One JSON file per entry under a root directory
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store rooted at `base_dir()`
    pub fn open_default() -> Result<Self, CacheError> {
        Ok(Self::new(base_dir()?))
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        let file = format!("{}.json", utf8_percent_encode(key, NON_ALPHANUMERIC));
        self.root.join(namespace).join(file)
    }
}

impl CacheStore for DiskStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<CachedValue>, CacheError> {
        let path = self.entry_path(namespace, key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Read { path, source }),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CacheError::Corrupt { path, source })
    }

    fn set(&self, namespace: &str, key: &str, entry: &CachedValue) -> Result<(), CacheError> {
        let path = self.entry_path(namespace, key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string(entry)?;
        std::fs::write(&path, content).map_err(|source| CacheError::Write { path, source })
    }
}

/// Returns the base cache directory: `~/.cache/flakedeps`
pub fn base_dir() -> Result<PathBuf, CacheError> {
    // Use XDG_CACHE_HOME if set, otherwise fall back to ~/.cache
    let cache_base = std::env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".cache"))
                .unwrap_or_default()
        });

    if cache_base.as_os_str().is_empty() {
        return Err(CacheError::NoCacheDir);
    }

    Ok(cache_base.join("flakedeps"))
}

/// Memoizes expensive lookups in a `CacheStore`
pub struct PackageCache {
    store: Box<dyn CacheStore>,
    ttl: Duration,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PackageCache {
    pub fn new(store: Box<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn memory(ttl: Duration) -> Self {
        Self::new(Box::new(MemoryStore::new()), ttl)
    }

    /// Return the cached value for `key`, or compute and store it
    ///
    /// Expired entries are recomputed. With `fallback`, an expired entry is
    /// returned when `compute` fails instead of the error.
    pub fn with_cache<T, E, F>(
        &self,
        namespace: &str,
        key: &str,
        fallback: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        let slot_id = format!("{namespace}\u{0}{key}");
        let slot = self.slot(&slot_id);
        let result = {
            let _guard = lock(&slot);
            self.lookup_or_compute(namespace, key, fallback, compute)
        };
        self.release(&slot_id, slot);
        result
    }

    fn lookup_or_compute<T, E, F>(
        &self,
        namespace: &str,
        key: &str,
        fallback: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        let cached = self.store.get(namespace, key).unwrap_or_else(|err| {
            tracing::warn!(namespace, key, %err, "cache read failed, fetching live");
            None
        });

        let mut stale = None;
        if let Some(entry) = cached {
            let fresh = !self.is_expired(&entry);
            match serde_json::from_value::<T>(entry.value) {
                Ok(value) if fresh => {
                    tracing::trace!(namespace, key, "cache hit");
                    return Ok(value);
                }
                Ok(value) => stale = Some(value),
                Err(err) => tracing::warn!(namespace, key, %err, "ignoring unreadable cache entry"),
            }
        }

        match compute() {
            Ok(value) => {
                self.store_value(namespace, key, &value);
                Ok(value)
            }
            Err(err) => match stale {
                Some(value) if fallback => {
                    tracing::debug!(namespace, key, "lookup failed, using expired cache entry");
                    Ok(value)
                }
                _ => Err(err),
            },
        }
    }

    fn store_value<T: Serialize>(&self, namespace: &str, key: &str, value: &T) {
        let entry = match serde_json::to_value(value) {
            Ok(value) => CachedValue {
                stored_at: now_secs(),
                value,
            },
            Err(err) => {
                tracing::warn!(namespace, key, %err, "cannot serialize value for cache");
                return;
            }
        };

        if let Err(err) = self.store.set(namespace, key, &entry) {
            tracing::warn!(namespace, key, %err, "cache write failed");
        }
    }

    fn is_expired(&self, entry: &CachedValue) -> bool {
        now_secs().saturating_sub(entry.stored_at) >= self.ttl.as_secs()
    }

    fn slot(&self, slot_id: &str) -> Arc<Mutex<()>> {
        let mut in_flight = lock(&self.in_flight);
        in_flight
            .entry(slot_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release(&self, slot_id: &str, slot: Arc<Mutex<()>>) {
        let mut in_flight = lock(&self.in_flight);
        // the map holds one reference and we hold the other
        if Arc::strong_count(&slot) <= 2 {
            in_flight.remove(slot_id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
