/// In-process cache backend
///
/// Entries expire on read; there is no size bound and no eviction besides
/// expiry.
use super::CacheBackend;
use crate::error::{WikiError, WikiResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_raw(&self, key: &str) -> WikiResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it, unless a writer replaced it in between
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> WikiResult<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> WikiResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn clear_pattern(&self, pattern: &str) -> WikiResult<u64> {
        let matcher = glob::Pattern::new(pattern)
            .map_err(|e| WikiError::Validation(format!("Invalid cache pattern: {}", e)))?;

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !matcher.matches(key));
        Ok((before - entries.len()) as u64)
    }

    async fn ping(&self) -> WikiResult<()> {
        Ok(())
    }
}
