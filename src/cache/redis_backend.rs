/// Redis cache backend
use super::CacheBackend;
use crate::error::{WikiError, WikiResult};
use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Redis cache client
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis and confirm the server answers
    pub async fn connect(redis_url: &str) -> WikiResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            WikiError::Cache(format!("Redis client creation failed: {}", e))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            warn!("Failed to connect to Redis: {}", e);
            WikiError::Cache(format!("Redis connection failed: {}", e))
        })?;

        let cache = Self { connection };
        cache.ping().await?;

        info!("✓ Redis connection established");

        Ok(cache)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get_raw(&self, key: &str) -> WikiResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(|e| {
            warn!("Redis GET failed for {}: {}", key, e);
            WikiError::Cache(format!("Cache get failed: {}", e))
        })
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> WikiResult<()> {
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);

        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|e| {
                warn!("Redis SET failed for {}: {}", key, e);
                WikiError::Cache(format!("Cache set failed: {}", e))
            })?;

        debug!("Redis SET {} (TTL: {}s)", key, seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> WikiResult<bool> {
        let mut conn = self.connection.clone();
        let removed: u64 = conn.del(key).await.map_err(|e| {
            warn!("Redis DELETE failed for {}: {}", key, e);
            WikiError::Cache(format!("Cache delete failed: {}", e))
        })?;
        Ok(removed > 0)
    }

    async fn clear_pattern(&self, pattern: &str) -> WikiResult<u64> {
        let mut conn = self.connection.clone();

        // Collect matching keys with SCAN
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = conn
                .scan_match::<_, String>(pattern)
                .await
                .map_err(|e| {
                    error!("Redis SCAN failed: {}", e);
                    WikiError::Cache(format!("Cache keys lookup failed: {}", e))
                })?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = conn.del(&keys).await.map_err(|e| {
            error!("Redis DELETE multiple keys failed: {}", e);
            WikiError::Cache(format!("Cache flush failed: {}", e))
        })?;

        Ok(deleted)
    }

    async fn ping(&self) -> WikiResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!("Redis PING failed: {}", e);
                WikiError::Cache(format!("Cache ping failed: {}", e))
            })?;

        if pong != "PONG" {
            return Err(WikiError::Cache("Unexpected Redis PING response".to_string()));
        }

        Ok(())
    }
}
