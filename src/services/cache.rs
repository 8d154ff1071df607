use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// Key/value cache for derived aggregates.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Removing a missing key is a no-op.
    async fn delete(&self, key: &str);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    ttl: Duration,
}

/// Expires every entry after the TTL it was stored with.
struct EntryTtl;

impl Expiry<String, CacheEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(10_000)
                .expire_after(EntryTtl)
                .build(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.entries.insert(key.to_string(), CacheEntry { value, ttl }).await;
    }

    async fn delete(&self, key: &str) {
        self.entries.invalidate(key).await;
    }
}
