/*!
 * Key/value cache used to memoize expensive counts.
 *
 * The cache is injected into the managers as an `Arc<dyn CacheBackend>`.
 * Entries expire after a TTL; there is no write-triggered eviction, so
 * readers must tolerate stale values until the entry times out.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::RwLock;
use serde_json::Value;

/// Cache backend interface
pub trait CacheBackend: Send + Sync {
    /// Fetch a live value
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value; `None` uses the backend default TTL
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>);

    /// Remove a value
    fn delete(&self, key: &str);

    /// Drop every entry
    fn clear(&self);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// In-process cache with per-entry expiry
pub struct MemoryCache {
    /// Internal cache storage
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,

    /// Cache hit counter
    hits: Arc<RwLock<usize>>,

    /// Cache miss counter
    misses: Arc<RwLock<usize>>,

    /// TTL applied when the caller does not pass one
    default_ttl: Duration,

    /// Whether caching is enabled
    enabled: bool,
}

impl MemoryCache {
    /// Create a new cache
    pub fn new(enabled: bool, default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
            default_ttl,
            enabled,
        }
    }

    /// Get cache statistics as `(hits, misses, hit rate)`
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop expired entries
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Default TTL of this cache
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Check if the cache is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }

        let found = {
            let entries = self.entries.read();
            entries
                .get(key)
                .filter(|entry| entry.expires_at > Instant::now())
                .map(|entry| entry.value.clone())
        };

        match found {
            Some(value) => {
                *self.hits.write() += 1;
                debug!("Cache hit for '{}'", key);
                Some(value)
            }
            None => {
                *self.misses.write() += 1;
                debug!("Cache miss for '{}'", key);
                None
            }
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        if !self.enabled {
            return;
        }

        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries
            .write()
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn clear(&self) {
        self.entries.write().clear();
        *self.hits.write() = 0;
        *self.misses.write() = 0;
        debug!("Cache cleared");
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(true, Duration::from_secs(300))
    }
}

impl Clone for MemoryCache {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            hits: self.hits.clone(),
            misses: self.misses.clone(),
            default_ttl: self.default_ttl,
            enabled: self.enabled,
        }
    }
}
