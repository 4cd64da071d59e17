//! Query management
//!
//! A reactive query system for server state: cache-first reads with
//! configurable staleness, stale-while-revalidate background refetch,
//! per-query retry, and scope-level invalidation. Services define a
//! [`Query`] per remote read; screens go through the [`QueryClient`].

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use storage::{CacheConfig, CacheError, TieredCache};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Query errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// Query fetch failed
    #[error("Query fetch failed: {0}")]
    FetchError(String),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Key identifying a query in the cache
///
/// Mirrors the `["courses", courseId]`-style keys the screens think in:
/// a scope, an id within the scope, and optional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct QueryKey {
    /// Scope of the query (e.g., "courses", "notifications", "session")
    pub scope: String,

    /// Unique identifier within the scope
    pub id: String,

    /// Optional parameters
    pub params: HashMap<String, String>,
}

impl QueryKey {
    /// Create a new query key
    pub fn new(scope: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            id: id.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter to the query key
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Convert to the string key used by the cache
    pub fn to_cache_key(&self) -> String {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.scope.hash(&mut hasher);
        self.id.hash(&mut hasher);
        // Hash params in sorted order for consistency
        let mut params: Vec<_> = self.params.iter().collect();
        params.sort_by_key(|(k, _)| *k);
        for (k, v) in params {
            k.hash(&mut hasher);
            v.hash(&mut hasher);
        }
        format!("query:{}:{}:{:x}", self.scope, self.id, hasher.finish())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)
    }
}

/// Query configuration
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Time until data becomes stale
    pub stale_time: Duration,

    /// Cache TTL
    pub cache_time: Duration,

    /// Refetch in the background when serving stale data
    pub refetch_on_stale: bool,

    /// Retry failed fetches
    pub retry: bool,

    /// Maximum fetch attempts when retrying
    pub retry_count: u32,

    /// Delay between attempts
    pub retry_delay: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(0), // Immediately stale
            cache_time: Duration::from_secs(300),
            refetch_on_stale: true,
            retry: true,
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl QueryConfig {
    /// Configuration for data that must never be served from cache
    /// without manual invalidation (e.g. session state)
    pub fn manual() -> Self {
        Self {
            stale_time: Duration::from_secs(0),
            cache_time: Duration::from_secs(300),
            refetch_on_stale: false,
            retry: false,
            retry_count: 0,
            retry_delay: Duration::from_secs(0),
        }
    }
}

/// Query trait for defining data fetching logic
#[async_trait]
pub trait Query: Send + Sync + Clone {
    /// The type of data this query returns
    type Data: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Fetch the data
    async fn fetch(&self) -> Result<Self::Data>;

    /// Get the query key
    fn key(&self) -> QueryKey;

    /// Get the query configuration
    fn config(&self) -> QueryConfig {
        QueryConfig::default()
    }
}

#[derive(Debug, Clone)]
struct QueryMeta {
    key: QueryKey,
    stale_at: Option<SystemTime>,
    last_error: Option<String>,
}

impl QueryMeta {
    fn is_stale(&self) -> bool {
        match self.stale_at {
            Some(stale_at) => SystemTime::now() >= stale_at,
            None => true,
        }
    }
}

/// Query client managing the cache and fetch lifecycle
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<TieredCache<String>>,
    meta: Arc<RwLock<HashMap<String, QueryMeta>>>,
    refetching: Arc<Mutex<HashSet<String>>>,
}

impl QueryClient {
    /// Create a new query client
    pub fn new(cache_config: CacheConfig) -> Result<Self> {
        let cache = TieredCache::new(cache_config)?;

        Ok(Self {
            cache: Arc::new(cache),
            meta: Arc::new(RwLock::new(HashMap::new())),
            refetching: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Get query data, serving the cache when it is fresh
    ///
    /// Stale cached data is returned immediately; when the query allows
    /// it, a background refetch refreshes the cache for the next read.
    pub async fn get<Q: Query + 'static>(&self, query: &Q) -> Result<Q::Data> {
        let cache_key = query.key().to_cache_key();
        let config = query.config();

        let cached = match self.cache.get(&cache_key) {
            Ok(value) => value,
            Err(CacheError::Expired(_)) => None,
            Err(e) => return Err(e.into()),
        };

        if let Some(serialized) = cached {
            let data: Q::Data = serde_json::from_str(&serialized)?;

            let stale = {
                let meta = self.meta.read().await;
                meta.get(&cache_key).map(|m| m.is_stale()).unwrap_or(false)
            };

            if stale && config.refetch_on_stale {
                self.spawn_refetch(query.clone(), cache_key);
            }

            return Ok(data);
        }

        self.fetch(query).await
    }

    /// Fetch query data, bypassing the cache
    pub async fn fetch<Q: Query>(&self, query: &Q) -> Result<Q::Data> {
        let cache_key = query.key().to_cache_key();
        let config = query.config();

        let max_attempts = if config.retry { config.retry_count.max(1) } else { 1 };
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                tokio::time::sleep(config.retry_delay).await;
            }

            match query.fetch().await {
                Ok(data) => {
                    self.store(query.key(), &data, &config).await?;
                    return Ok(data);
                }
                Err(e) => last_error = Some(e),
            }
        }

        let error = last_error.unwrap_or_else(|| QueryError::FetchError("no attempts".into()));

        {
            let mut meta = self.meta.write().await;
            if let Some(entry) = meta.get_mut(&cache_key) {
                entry.last_error = Some(error.to_string());
            }
        }

        Err(error)
    }

    /// Write data for a query directly, as after a mutation response
    pub async fn set<Q: Query>(&self, query: &Q, data: &Q::Data) -> Result<()> {
        self.store(query.key(), data, &query.config()).await
    }

    /// Invalidate a single query
    pub async fn invalidate(&self, key: &QueryKey) -> Result<()> {
        let cache_key = key.to_cache_key();
        self.cache.remove(&cache_key)?;
        self.meta.write().await.remove(&cache_key);
        Ok(())
    }

    /// Invalidate every query in a scope
    pub async fn invalidate_scope(&self, scope: &str) -> Result<()> {
        let mut meta = self.meta.write().await;

        let cache_keys: Vec<String> = meta
            .iter()
            .filter(|(_, m)| m.key.scope == scope)
            .map(|(k, _)| k.clone())
            .collect();

        for cache_key in cache_keys {
            self.cache.remove(&cache_key)?;
            meta.remove(&cache_key);
        }

        Ok(())
    }

    /// Last fetch error recorded for a query, if any
    pub async fn last_error(&self, key: &QueryKey) -> Option<String> {
        let meta = self.meta.read().await;
        meta.get(&key.to_cache_key()).and_then(|m| m.last_error.clone())
    }

    async fn store<D: Serialize>(
        &self,
        key: QueryKey,
        data: &D,
        config: &QueryConfig,
    ) -> Result<()> {
        let cache_key = key.to_cache_key();
        let serialized = serde_json::to_string(data)?;
        self.cache
            .put(cache_key.clone(), serialized, Some(config.cache_time))?;

        let mut meta = self.meta.write().await;
        meta.insert(
            cache_key,
            QueryMeta {
                key,
                stale_at: Some(SystemTime::now() + config.stale_time),
                last_error: None,
            },
        );

        Ok(())
    }

    fn spawn_refetch<Q: Query + 'static>(&self, query: Q, cache_key: String) {
        let client = self.clone();

        tokio::spawn(async move {
            // One refetch per key at a time
            {
                let mut refetching = client.refetching.lock().await;
                if !refetching.insert(cache_key.clone()) {
                    return;
                }
            }

            if let Err(e) = client.fetch(&query).await {
                tracing::debug!(key = %query.key(), error = %e, "background refetch failed");
            }

            client.refetching.lock().await.remove(&cache_key);
        });
    }
}
