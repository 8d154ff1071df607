use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::PricingConfig;
use crate::error::Result;
use crate::models::{
    plan::{Plan, UpdatePlanRequest},
    service::{Service, UpdateServiceRequest},
    subscription::{CreateSubscriptionRequest, Subscription, SubscriptionListResponse},
};
use crate::services::{
    cache::{CacheStore, MemoryCache},
    change_detector::ChangeDetector,
    database::DatabaseService,
    invalidator::CacheInvalidator,
    tasks::{TaskKind, TaskQueue},
};

/// Application entry point for subscription and pricing edits.
///
/// Every write that affects a derived price goes through here so that the
/// matching background work is scheduled once the write has committed.
#[derive(Clone)]
pub struct SubscriptionService {
    db: DatabaseService,
    cache: Arc<dyn CacheStore>,
    invalidator: CacheInvalidator,
    queue: TaskQueue,
    detector: ChangeDetector,
    cache_key: String,
    cache_ttl: Duration,
}

impl SubscriptionService {
    pub fn new(config: &PricingConfig) -> Self {
        Self::with_cache(config, Arc::new(MemoryCache::new()))
    }

    pub fn with_cache(config: &PricingConfig, cache: Arc<dyn CacheStore>) -> Self {
        let invalidator = CacheInvalidator::new(cache.clone(), config.price_cache_key.clone());
        let db = DatabaseService::new().with_deletion_hook(Arc::new(invalidator.clone()));
        let queue = TaskQueue::new(db.clone(), invalidator.clone(), config.task_workers);
        let detector = ChangeDetector::new(db.clone(), queue.clone());

        Self {
            db,
            cache,
            invalidator,
            queue,
            detector,
            cache_key: config.price_cache_key.clone(),
            cache_ttl: config.price_cache_ttl(),
        }
    }

    pub fn db(&self) -> &DatabaseService {
        &self.db
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<Subscription> {
        let subscription = self.db.create_subscription(request).await?;
        log::info!("Created subscription {}", subscription.id);
        self.queue.enqueue(TaskKind::RecomputePrice, subscription.id).await;
        Ok(subscription)
    }

    pub async fn update_service(
        &self,
        service_id: &Uuid,
        request: UpdateServiceRequest,
    ) -> Result<Service> {
        let change = self.db.update_service(service_id, request).await?;
        self.detector.service_updated(&change).await;
        Ok(change.after)
    }

    pub async fn update_plan(&self, plan_id: &Uuid, request: UpdatePlanRequest) -> Result<Plan> {
        let change = self.db.update_plan(plan_id, request).await?;
        self.detector.plan_updated(&change).await;
        Ok(change.after)
    }

    pub async fn delete_subscription(&self, subscription_id: &Uuid) -> Result<Subscription> {
        self.db.delete_subscription(subscription_id).await
    }

    /// Sum of all subscription prices, served from the cache while it is warm.
    ///
    /// A total summed while an eviction happens is returned but not cached.
    pub async fn total_price(&self) -> Decimal {
        if let Some(cached) = self.cache.get(&self.cache_key).await {
            match Decimal::from_str(&cached) {
                Ok(total) => return total,
                Err(e) => log::warn!("Discarding unreadable cache entry {}: {}", self.cache_key, e),
            }
        }

        let generation = self.invalidator.generation();
        let total = self.db.total_price().await;
        self.invalidator
            .store_if_current(generation, total.to_string(), self.cache_ttl)
            .await;
        total
    }

    pub async fn list_subscriptions(&self) -> SubscriptionListResponse {
        SubscriptionListResponse {
            subscriptions: self.db.list_subscription_details().await,
            total_amount: self.total_price().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::tests::{seed, subscribe};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Cache whose next `set` parks until released.
    #[derive(Default)]
    struct GatedCache {
        inner: MemoryCache,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl CacheStore for GatedCache {
        async fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String, ttl: Duration) {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.set(key, value, ttl).await;
        }

        async fn delete(&self, key: &str) {
            self.inner.delete(key).await;
        }
    }

    fn service() -> SubscriptionService {
        SubscriptionService::new(&PricingConfig::default())
    }

    #[tokio::test]
    async fn test_discount_change_settles_price_and_comment() {
        let app = service();
        let fixture = seed(app.db(), 1000, 10).await;

        let subscription = app.create_subscription(subscribe(&fixture)).await.unwrap();
        app.queue().settle().await;
        let settled = app.db().get_subscription(&subscription.id).await.unwrap();
        assert_eq!(settled.price, Decimal::from(900));

        app.update_plan(
            &fixture.plan.id,
            UpdatePlanRequest { plan_type: None, discount_percent: Some(20) },
        )
            .await
            .unwrap();
        app.queue().settle().await;
        let first_comment = app.db().get_subscription(&subscription.id).await.unwrap();
        assert_eq!(first_comment.price, Decimal::from(800));
        let first_stamp = first_comment.commented_at().unwrap();

        app.update_plan(
            &fixture.plan.id,
            UpdatePlanRequest { plan_type: None, discount_percent: Some(25) },
        )
            .await
            .unwrap();
        app.queue().settle().await;
        let second_comment = app.db().get_subscription(&subscription.id).await.unwrap();
        assert_eq!(second_comment.price, Decimal::from(750));
        assert!(second_comment.commented_at().unwrap() > first_stamp);
    }

    #[tokio::test]
    async fn test_one_recompute_per_subscription_per_update() {
        let app = service();
        let fixture = seed(app.db(), 1000, 10).await;
        for _ in 0..3 {
            app.create_subscription(subscribe(&fixture)).await.unwrap();
        }
        app.queue().settle().await;
        let before = app.queue().stats();

        app.update_service(
            &fixture.service.id,
            UpdateServiceRequest { name: None, full_price: Some(1500) },
        )
            .await
            .unwrap();
        app.queue().settle().await;
        let after = app.queue().stats();

        assert_eq!(after.recompute_runs - before.recompute_runs, 3);
        assert_eq!(after.comment_runs - before.comment_runs, 3);
        assert_eq!(app.total_price().await, Decimal::from(3 * 1350));
    }

    #[tokio::test]
    async fn test_no_change_enqueues_nothing() {
        let app = service();
        let fixture = seed(app.db(), 1000, 10).await;
        app.create_subscription(subscribe(&fixture)).await.unwrap();
        app.queue().settle().await;
        let before = app.queue().stats();

        app.update_service(
            &fixture.service.id,
            UpdateServiceRequest { name: None, full_price: Some(1000) },
        )
            .await
            .unwrap();
        app.queue().settle().await;
        assert_eq!(app.queue().stats(), before);
    }

    #[tokio::test]
    async fn test_rapid_updates_end_on_latest_inputs() {
        let app = service();
        let fixture = seed(app.db(), 1000, 10).await;
        let subscription = app.create_subscription(subscribe(&fixture)).await.unwrap();
        app.queue().settle().await;

        for full_price in [1100, 1200, 1300, 2000] {
            let request = UpdateServiceRequest { name: None, full_price: Some(full_price) };
            app.update_service(&fixture.service.id, request).await.unwrap();
        }
        app.queue().settle().await;

        let settled = app.db().get_subscription(&subscription.id).await.unwrap();
        assert_eq!(settled.price, Decimal::from(1800));
        assert_eq!(app.queue().stats().failed, 0);
    }

    #[tokio::test]
    async fn test_total_is_cached_until_invalidated() {
        let app = service();
        let fixture = seed(app.db(), 1000, 10).await;
        let first = app.create_subscription(subscribe(&fixture)).await.unwrap();
        app.create_subscription(subscribe(&fixture)).await.unwrap();
        app.queue().settle().await;

        assert_eq!(app.total_price().await, Decimal::from(1800));
        let cached = app.cache.get("price_cache").await.unwrap();
        assert_eq!(Decimal::from_str(&cached).unwrap(), Decimal::from(1800));

        app.delete_subscription(&first.id).await.unwrap();
        assert_eq!(app.cache.get("price_cache").await, None);
        assert_eq!(app.total_price().await, Decimal::from(900));
    }

    #[tokio::test]
    async fn test_listing_reports_total_amount() {
        let app = service();
        let fixture = seed(app.db(), 1000, 10).await;
        app.create_subscription(subscribe(&fixture)).await.unwrap();
        app.queue().settle().await;

        let listing = app.list_subscriptions().await;
        assert_eq!(listing.subscriptions.len(), 1);
        assert_eq!(listing.subscriptions[0].client_name, "Acme Ltd");
        assert_eq!(listing.total_amount, Decimal::from(900));
    }

    #[tokio::test]
    async fn test_total_summed_before_delete_does_not_outlive_it() {
        let cache = Arc::new(GatedCache::default());
        let app = SubscriptionService::with_cache(&PricingConfig::default(), cache.clone());
        let fixture = seed(app.db(), 1000, 10).await;
        let first = app.create_subscription(subscribe(&fixture)).await.unwrap();
        app.create_subscription(subscribe(&fixture)).await.unwrap();
        app.queue().settle().await;

        // The reader sums both rows, then stalls while writing the cache.
        cache.armed.store(true, Ordering::SeqCst);
        let reader = {
            let app = app.clone();
            tokio::spawn(async move { app.total_price().await })
        };
        cache.entered.notified().await;

        let deleter = {
            let app = app.clone();
            tokio::spawn(async move { app.delete_subscription(&first.id).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.release.notify_one();

        assert_eq!(reader.await.unwrap(), Decimal::from(1800));
        deleter.await.unwrap().unwrap();

        assert_eq!(app.db().total_price().await, Decimal::from(900));
        assert_eq!(cache.get("price_cache").await, None);
        assert_eq!(app.total_price().await, Decimal::from(900));
    }
}
