//! Cache for server data
//!
//! LRU in-memory cache with per-entry TTL, plus an optional sled-backed
//! disk tier so query results survive a cold start. The reactive query
//! layer sits on top of this.

use lru::LruCache;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use thiserror::Error;

use crate::kv::{KvConfig, KvError, KvStore};

/// Cache error types
#[derive(Debug, Error)]
pub enum CacheError {
    /// Entry expired
    #[error("Entry expired: {0}")]
    Expired(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// KV store error
    #[error("KV store error: {0}")]
    Kv(#[from] KvError),
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Cache entry with expiry metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<SystemTime>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| SystemTime::now() + d);
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => SystemTime::now() > expires_at,
            None => false,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the memory tier
    pub max_entries: usize,
    /// Default TTL for entries
    pub default_ttl: Option<Duration>,
    /// Enable the disk tier
    pub enable_disk_cache: bool,
    /// Disk tier path
    pub disk_cache_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: Some(Duration::from_secs(3600)),
            enable_disk_cache: false,
            disk_cache_path: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set default TTL
    pub fn default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Enable disk cache with path
    pub fn with_disk_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.enable_disk_cache = true;
        self.disk_cache_path = Some(path.into());
        self
    }
}

/// In-memory LRU cache
pub struct MemoryCache<V> {
    cache: Arc<Mutex<LruCache<String, CacheEntry<V>>>>,
    config: CacheConfig,
}

impl<V: Clone> MemoryCache<V> {
    /// Create a new memory cache
    pub fn new(config: CacheConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::new(1).unwrap());

        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            config,
        }
    }

    /// Get a value from the cache
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        let mut cache = self.cache.lock().unwrap();

        let is_expired = cache.peek(key).map(|e| e.is_expired()).unwrap_or(false);

        if is_expired {
            cache.pop(key);
            return Err(CacheError::Expired(key.to_string()));
        }

        Ok(cache.get(key).map(|entry| entry.value.clone()))
    }

    /// Put a value in the cache
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry::new(value, ttl.or(self.config.default_ttl));

        let mut cache = self.cache.lock().unwrap();
        cache.put(key.into(), entry);

        Ok(())
    }

    /// Remove a value from the cache, returning whether it existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut cache = self.cache.lock().unwrap();
        Ok(cache.pop(key).is_some())
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
    }

    /// Check if key exists and is not expired
    pub fn contains(&self, key: &str) -> bool {
        let mut cache = self.cache.lock().unwrap();

        match cache.peek(key) {
            Some(entry) if entry.is_expired() => {
                cache.pop(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap().is_empty()
    }

    /// Remove expired entries, returning how many were dropped
    pub fn evict_expired(&self) -> usize {
        let mut cache = self.cache.lock().unwrap();

        let expired_keys: Vec<String> = cache
            .iter()
            .filter_map(|(k, v)| if v.is_expired() { Some(k.clone()) } else { None })
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            cache.pop(&key);
        }

        count
    }
}

/// Disk tier backed by the key-value store
pub struct DiskCache<V> {
    store: Arc<KvStore>,
    config: CacheConfig,
    _phantom: std::marker::PhantomData<V>,
}

impl<V: Serialize + DeserializeOwned> DiskCache<V> {
    /// Create a new disk cache
    pub fn new(config: CacheConfig) -> Result<Self> {
        let path = config
            .disk_cache_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("passage_cache.db"));

        let kv_config = KvConfig::new(path.to_string_lossy().to_string()).use_compression(true);
        let store = KvStore::new(kv_config)?;

        Ok(Self {
            store: Arc::new(store),
            config,
            _phantom: std::marker::PhantomData,
        })
    }

    /// Get a value from disk
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        let entry: Option<CacheEntry<V>> = self.store.get(key)?;

        match entry {
            Some(entry) if entry.is_expired() => {
                self.store.remove(key)?;
                Err(CacheError::Expired(key.to_string()))
            }
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    /// Put a value on disk
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()> {
        let key = key.into();
        let entry = CacheEntry::new(value, ttl.or(self.config.default_ttl));

        self.store.set(&key, &entry)?;
        Ok(())
    }

    /// Remove a value from disk
    pub fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.store.remove(key)?)
    }

    /// Clear all entries
    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        Ok(())
    }
}

/// Tiered cache with memory and optional disk layers
pub struct TieredCache<V> {
    memory: MemoryCache<V>,
    disk: Option<DiskCache<V>>,
}

impl<V: Clone + Serialize + DeserializeOwned> TieredCache<V> {
    /// Create a new tiered cache
    pub fn new(config: CacheConfig) -> Result<Self> {
        let memory = MemoryCache::new(config.clone());

        let disk = if config.enable_disk_cache {
            Some(DiskCache::new(config)?)
        } else {
            None
        };

        Ok(Self { memory, disk })
    }

    /// Get a value, checking memory first, then disk
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        if let Some(value) = self.memory.get(key)? {
            return Ok(Some(value));
        }

        if let Some(disk) = &self.disk {
            if let Some(value) = disk.get(key)? {
                // Promote to the memory tier
                self.memory.put(key, value.clone(), None)?;
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    /// Put a value in all tiers
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()> {
        let key = key.into();

        self.memory.put(&key, value.clone(), ttl)?;

        if let Some(disk) = &self.disk {
            disk.put(&key, value, ttl)?;
        }

        Ok(())
    }

    /// Remove from all tiers
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mem_removed = self.memory.remove(key)?;

        let disk_removed = match &self.disk {
            Some(disk) => disk.remove(key)?,
            None => false,
        };

        Ok(mem_removed || disk_removed)
    }

    /// Clear all tiers
    pub fn clear(&self) -> Result<()> {
        self.memory.clear();

        if let Some(disk) = &self.disk {
            disk.clear()?;
        }

        Ok(())
    }

    /// Evict expired entries from memory
    pub fn evict_expired(&self) -> usize {
        self.memory.evict_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_basic() {
        let config = CacheConfig::new().max_entries(10);
        let cache: MemoryCache<String> = MemoryCache::new(config);

        cache.put("key1", "value1".to_string(), None).unwrap();

        assert_eq!(cache.get("key1").unwrap(), Some("value1".to_string()));
        assert_eq!(cache.get("missing").unwrap(), None);
    }

    #[test]
    fn test_memory_cache_ttl() {
        let config = CacheConfig::new().default_ttl(Some(Duration::from_millis(50)));
        let cache: MemoryCache<i32> = MemoryCache::new(config);

        cache.put("key1", 42, None).unwrap();
        assert_eq!(cache.get("key1").unwrap(), Some(42));

        std::thread::sleep(Duration::from_millis(80));

        let result = cache.get("key1");
        assert!(matches!(result, Err(CacheError::Expired(_))));
    }

    #[test]
    fn test_memory_cache_lru_eviction() {
        let config = CacheConfig::new().max_entries(2).default_ttl(None);
        let cache: MemoryCache<i32> = MemoryCache::new(config);

        cache.put("key1", 1, None).unwrap();
        cache.put("key2", 2, None).unwrap();
        cache.put("key3", 3, None).unwrap();

        // key1 was least recently used
        assert_eq!(cache.get("key1").unwrap(), None);
        assert_eq!(cache.get("key2").unwrap(), Some(2));
        assert_eq!(cache.get("key3").unwrap(), Some(3));
    }

    #[test]
    fn test_memory_cache_remove_and_clear() {
        let cache: MemoryCache<i32> = MemoryCache::new(CacheConfig::new());

        cache.put("key1", 1, None).unwrap();
        assert!(cache.remove("key1").unwrap());
        assert!(!cache.remove("key1").unwrap());

        cache.put("key2", 2, None).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evict_expired() {
        let cache: MemoryCache<i32> = MemoryCache::new(CacheConfig::new().default_ttl(None));

        cache.put("short", 1, Some(Duration::from_millis(10))).unwrap();
        cache.put("long", 2, None).unwrap();

        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long").unwrap(), Some(2));
    }

    #[test]
    fn test_tiered_cache_memory_only() {
        let cache: TieredCache<String> = TieredCache::new(CacheConfig::new()).unwrap();

        cache.put("key1", "value1".to_string(), None).unwrap();
        assert_eq!(cache.get("key1").unwrap(), Some("value1".to_string()));

        assert!(cache.remove("key1").unwrap());
        assert_eq!(cache.get("key1").unwrap(), None);
    }

    #[test]
    fn test_tiered_cache_disk_promotion() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CacheConfig::new()
            .max_entries(10)
            .with_disk_cache(dir.path().join("cache.db"));

        let cache: TieredCache<String> = TieredCache::new(config).unwrap();
        cache.put("key1", "value1".to_string(), None).unwrap();

        // Drop the memory entry; the disk tier should still serve it
        cache.memory.remove("key1").unwrap();
        assert_eq!(cache.get("key1").unwrap(), Some("value1".to_string()));

        // And the hit promoted it back to memory
        assert!(cache.memory.contains("key1"));
    }
}
