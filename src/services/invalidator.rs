use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::models::subscription::Subscription;
use crate::services::cache::CacheStore;
use crate::services::database::SubscriptionDeletionHook;

/// Owns the cached price aggregate: evicts it so the next reader recomputes
/// it, and refuses writes of a total computed before the latest eviction.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Arc<dyn CacheStore>,
    key: String,
    generation: Arc<AtomicU64>,
    // Serializes eviction against the generation check in `store_if_current`.
    write_lock: Arc<Mutex<()>>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn CacheStore>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
            generation: Arc::new(AtomicU64::new(0)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read before computing a value that will be passed to `store_if_current`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn invalidate(&self) {
        let _guard = self.write_lock.lock().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.delete(&self.key).await;
        log::debug!("Evicted cache entry {}", self.key);
    }

    /// Stores `value` unless an eviction happened since `generation` was read.
    pub async fn store_if_current(&self, generation: u64, value: String, ttl: Duration) -> bool {
        let _guard = self.write_lock.lock().await;
        if self.generation() != generation {
            log::debug!("Not caching {}: evicted while it was being computed", self.key);
            return false;
        }
        self.cache.set(&self.key, value, ttl).await;
        true
    }
}

#[async_trait]
impl SubscriptionDeletionHook for CacheInvalidator {
    async fn subscription_deleted(&self, subscription: &Subscription) {
        log::debug!("Subscription {} deleted, invalidating {}", subscription.id, self.key);
        self.invalidate().await;
    }
}
