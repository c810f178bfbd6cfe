/// Caching layer for the wiki
///
/// `CacheManager` stores JSON-serialized values under prefixed keys with a
/// TTL. It talks to Redis when `REDIS_URL` is set and reachable, and falls
/// back to an in-process map otherwise. Backend failures are logged and
/// treated as misses; the cache never fails a request.
pub mod memory;
pub mod redis_backend;

pub use memory::MemoryCache;
pub use redis_backend::RedisCache;

use crate::{config::CacheConfig, error::WikiResult, metrics};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache storage backend
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logs and metrics
    fn name(&self) -> &'static str;

    /// Fetch the raw value stored under a fully-qualified key
    async fn get_raw(&self, key: &str) -> WikiResult<Option<String>>;

    /// Store a raw value with an expiry
    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> WikiResult<()>;

    /// Remove a key, reporting whether it existed
    async fn delete(&self, key: &str) -> WikiResult<bool>;

    /// Remove every key matching a glob pattern, returning how many were removed
    async fn clear_pattern(&self, pattern: &str) -> WikiResult<u64>;

    /// Check the backend is reachable
    async fn ping(&self) -> WikiResult<()>;
}

/// Cache namespaces
pub mod namespaces {
    pub const SEARCH: &str = "search";
    pub const SUGGEST: &str = "suggest";
    pub const CATEGORIES: &str = "categories";
    pub const POPULAR: &str = "popular";
}

/// Counters kept by the manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Key/value cache with TTL
pub struct CacheManager {
    backend: Arc<dyn CacheBackend>,
    key_prefix: String,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheManager {
    /// Wrap an explicit backend
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            key_prefix: config.key_prefix.clone(),
            default_ttl: Duration::from_secs(config.default_ttl),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// In-process cache only
    pub fn in_memory(config: &CacheConfig) -> Self {
        Self::new(Arc::new(MemoryCache::new()), config)
    }

    /// Use Redis when configured and reachable, the in-memory map otherwise
    pub async fn connect(config: &CacheConfig) -> Self {
        if let Some(url) = &config.redis_url {
            match RedisCache::connect(url).await {
                Ok(redis) => return Self::new(Arc::new(redis), config),
                Err(e) => warn!("Redis unavailable, using in-memory cache: {}", e),
            }
        }

        info!("Using in-memory cache");
        Self::in_memory(config)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Build a cache key with prefix
    fn build_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache_key = self.build_key(key);

        let raw = match self.backend.get_raw(&cache_key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cache GET failed for {}: {}", cache_key, e);
                None
            }
        };

        let value = raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to deserialize cached value for {}: {}", cache_key, e);
                None
            }
        });

        self.record(value.is_some());
        debug!(
            "Cache {}: {}",
            if value.is_some() { "HIT" } else { "MISS" },
            cache_key
        );

        value
    }

    /// Get a value, falling back to `default` on a miss
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).await.unwrap_or(default)
    }

    /// Set a value with a TTL (the configured default when `None`)
    ///
    /// A zero TTL stores nothing. Returns whether the value was stored.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            return false;
        }

        let cache_key = self.build_key(key);
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize value for {}: {}", cache_key, e);
                return false;
            }
        };

        match self.backend.set_raw(&cache_key, json, ttl).await {
            Ok(()) => {
                debug!("Cache SET: {} (TTL: {}s)", cache_key, ttl.as_secs());
                true
            }
            Err(e) => {
                warn!("Cache SET failed for {}: {}", cache_key, e);
                false
            }
        }
    }

    /// Delete a value from cache
    pub async fn delete(&self, key: &str) -> bool {
        let cache_key = self.build_key(key);
        self.backend.delete(&cache_key).await.unwrap_or_else(|e| {
            warn!("Cache DELETE failed for {}: {}", cache_key, e);
            false
        })
    }

    /// Check if a key holds a live value
    pub async fn exists(&self, key: &str) -> bool {
        let cache_key = self.build_key(key);
        matches!(self.backend.get_raw(&cache_key).await, Ok(Some(_)))
    }

    /// Delete every key matching a glob pattern (prefix is applied)
    pub async fn clear_pattern(&self, pattern: &str) -> u64 {
        let cache_pattern = self.build_key(pattern);
        match self.backend.clear_pattern(&cache_pattern).await {
            Ok(count) => {
                debug!("Cache flushed {} keys matching {}", count, cache_pattern);
                count
            }
            Err(e) => {
                warn!("Cache flush failed for {}: {}", cache_pattern, e);
                0
            }
        }
    }

    /// Drop every entry in a namespace
    pub async fn invalidate_namespace(&self, namespace: &str) -> u64 {
        self.clear_pattern(&format!("{}:*", namespace)).await
    }

    /// Key for a memoized call: namespace plus a digest of the serialized arguments
    pub fn memo_key<A: Serialize + ?Sized>(namespace: &str, args: &A) -> String {
        let encoded = serde_json::to_vec(args).unwrap_or_default();
        let digest = Sha256::digest(&encoded);
        format!("{}:{}", namespace, hex::encode(digest))
    }

    /// Memoize an async computation
    ///
    /// Returns the cached value for `(namespace, args)` when present; otherwise
    /// awaits `compute`, caching its value when it succeeds.
    pub async fn cached<A, T, F, Fut>(
        &self,
        namespace: &str,
        args: &A,
        ttl: Option<Duration>,
        compute: F,
    ) -> WikiResult<T>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = WikiResult<T>>,
    {
        let key = Self::memo_key(namespace, args);

        if let Some(hit) = self.get::<T>(&key).await {
            return Ok(hit);
        }

        let value = compute().await?;
        self.set(&key, &value, ttl).await;
        Ok(value)
    }

    /// Check the backend is reachable
    pub async fn ping(&self) -> WikiResult<()> {
        self.backend.ping().await
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        CacheStats {
            backend: self.backend.name().to_string(),
            hits,
            misses,
            hit_rate: if hits + misses > 0 {
                hits as f64 / (hits + misses) as f64
            } else {
                0.0
            },
        }
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        metrics::record_cache_access(self.backend.name(), hit);
    }
}
