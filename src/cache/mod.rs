//! Timestamped payload cache.
//!
//! The cache lives in a plain key-value store under two keys: the serialized
//! payload and the unix-millisecond timestamp of the write. There is no
//! schema versioning and no locking between processes sharing a directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use serde_json::Value;
use thiserror::Error;

pub const PAYLOAD_KEY: &str = "books_cache";
pub const TIMESTAMP_KEY: &str = "books_cache_timestamp";

/// Default time-to-live of a cache entry (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access cache file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache value for '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("cache store lock poisoned")]
    Poisoned,
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Directory-backed store, one file per key.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        std::fs::write(&path, value).map_err(|e| CacheError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }
}

/// In-memory store for tests and for runs with caching disabled.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub payload: Value,
    pub stored_at: u64,
}

impl CacheEntry {
    pub fn new(payload: Value, stored_at: u64) -> Self {
        Self { payload, stored_at }
    }

    /// Reads the entry back. Both keys must be present; a half-written entry
    /// reads as absent.
    pub fn read(store: &dyn KeyValueStore) -> Result<Option<Self>, CacheError> {
        let (Some(payload), Some(timestamp)) = (store.get(PAYLOAD_KEY)?, store.get(TIMESTAMP_KEY)?)
        else {
            return Ok(None);
        };
        let stored_at = timestamp
            .trim()
            .parse::<u64>()
            .map_err(|e| CacheError::Corrupt {
                key: TIMESTAMP_KEY.to_string(),
                reason: e.to_string(),
            })?;
        let payload = serde_json::from_str(&payload).map_err(|e| CacheError::Corrupt {
            key: PAYLOAD_KEY.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(Self { payload, stored_at }))
    }

    pub fn write(&self, store: &dyn KeyValueStore) -> Result<(), CacheError> {
        let payload = serde_json::to_string(&self.payload).map_err(|e| CacheError::Corrupt {
            key: PAYLOAD_KEY.to_string(),
            reason: e.to_string(),
        })?;
        store.set(PAYLOAD_KEY, &payload)?;
        store.set(TIMESTAMP_KEY, &self.stored_at.to_string())
    }

    pub fn age(&self, now_millis: u64) -> Duration {
        Duration::from_millis(now_millis.saturating_sub(self.stored_at))
    }

    pub fn is_fresh(&self, now_millis: u64, ttl: Duration) -> bool {
        self.age(now_millis) < ttl
    }
}

pub fn clear(store: &dyn KeyValueStore) -> Result<(), CacheError> {
    store.remove(PAYLOAD_KEY)?;
    store.remove(TIMESTAMP_KEY)
}
