//! File-based JSON cache.
//!
//! Best-effort persistence for tracking lists and the last scan per
//! exchange. Read and write failures are logged and otherwise ignored.

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// File cache entry with timestamp
#[derive(Debug, Serialize, serde::Deserialize)]
struct CacheEntry<T> {
    data: T,
    timestamp: u64,
}

/// File-based cache service.
pub struct FileCache {
    cache_dir: PathBuf,
}

impl FileCache {
    /// Create a cache rooted at `cache_dir`, creating the directory if needed.
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        if !cache_dir.exists() {
            if let Err(e) = fs::create_dir_all(&cache_dir) {
                warn!("Failed to create cache directory {:?}: {}", cache_dir, e);
            }
        }
        Self { cache_dir }
    }

    fn get_path(&self, key: &str) -> PathBuf {
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.cache_dir.join(format!("{}.json", safe_key))
    }

    fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let content = fs::read_to_string(self.get_path(key)).ok()?;

        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to parse cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Get data from cache if it is younger than `max_age`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, max_age: Duration) -> Option<T> {
        let entry: CacheEntry<T> = self.read_entry(key)?;

        if now_secs().saturating_sub(entry.timestamp) > max_age.as_secs() {
            debug!("Cache entry {} expired", key);
            return None;
        }

        Some(entry.data)
    }

    /// Get data from cache regardless of age.
    pub fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_entry(key).map(|entry: CacheEntry<T>| entry.data)
    }

    /// Write data to the cache.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        let entry = CacheEntry {
            data,
            timestamp: now_secs(),
        };

        match serde_json::to_string(&entry) {
            Ok(content) => {
                if let Err(e) = fs::write(self.get_path(key), content) {
                    warn!("Failed to write cache {}: {}", key, e);
                } else {
                    debug!("Cached {} to disk", key);
                }
            }
            Err(e) => {
                warn!("Failed to serialize cache {}: {}", key, e);
            }
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
