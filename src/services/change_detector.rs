use uuid::Uuid;

use crate::models::{plan::PlanChange, service::ServiceChange};
use crate::services::database::DatabaseService;
use crate::services::tasks::{TaskKind, TaskQueue};

/// Turns committed service and plan edits into price/comment tasks for every
/// dependent subscription.
///
/// Callers hand over the row as it was before and after the write, and only
/// after the write is committed, so tasks never read an uncommitted value.
#[derive(Clone)]
pub struct ChangeDetector {
    db: DatabaseService,
    queue: TaskQueue,
}

impl ChangeDetector {
    pub fn new(db: DatabaseService, queue: TaskQueue) -> Self {
        Self { db, queue }
    }

    /// Returns the number of subscriptions scheduled for recomputation.
    pub async fn service_updated(&self, change: &ServiceChange) -> usize {
        if !change.full_price_changed() {
            return 0;
        }

        log::info!(
            "Service {} full price changed {} -> {}",
            change.after.id,
            change.before.full_price,
            change.after.full_price
        );
        let dependents = self.db.subscription_ids_for_service(&change.after.id).await;
        self.schedule(&dependents).await
    }

    pub async fn plan_updated(&self, change: &PlanChange) -> usize {
        if !change.discount_changed() {
            return 0;
        }

        log::info!(
            "Plan {} discount changed {}% -> {}%",
            change.after.id,
            change.before.discount_percent,
            change.after.discount_percent
        );
        let dependents = self.db.subscription_ids_for_plan(&change.after.id).await;
        self.schedule(&dependents).await
    }

    async fn schedule(&self, subscription_ids: &[Uuid]) -> usize {
        for subscription_id in subscription_ids {
            self.queue.enqueue(TaskKind::RecomputePrice, *subscription_id).await;
            self.queue.enqueue(TaskKind::RefreshComment, *subscription_id).await;
        }
        subscription_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{plan::UpdatePlanRequest, service::UpdateServiceRequest};
    use crate::services::cache::MemoryCache;
    use crate::services::database::tests::{seed, subscribe};
    use crate::services::invalidator::CacheInvalidator;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn detector(db: &DatabaseService) -> (ChangeDetector, TaskQueue) {
        let invalidator = CacheInvalidator::new(Arc::new(MemoryCache::new()), "price_cache");
        let queue = TaskQueue::new(db.clone(), invalidator, 2);
        (ChangeDetector::new(db.clone(), queue.clone()), queue)
    }

    #[tokio::test]
    async fn test_unchanged_price_schedules_nothing() {
        let db = DatabaseService::new();
        let (detector, queue) = detector(&db);
        let fixture = seed(&db, 1000, 10).await;
        db.create_subscription(subscribe(&fixture)).await.unwrap();

        let change = db
            .update_service(
                &fixture.service.id,
                UpdateServiceRequest { name: Some("Audit".to_string()), full_price: Some(1000) },
            )
            .await
            .unwrap();
        assert_eq!(detector.service_updated(&change).await, 0);

        queue.settle().await;
        assert_eq!(queue.stats().recompute_runs, 0);
        assert_eq!(queue.stats().comment_runs, 0);
    }

    #[tokio::test]
    async fn test_price_change_schedules_one_pair_per_subscription() {
        let db = DatabaseService::new();
        let (detector, queue) = detector(&db);
        let fixture = seed(&db, 1000, 10).await;
        let first = db.create_subscription(subscribe(&fixture)).await.unwrap();
        let second = db.create_subscription(subscribe(&fixture)).await.unwrap();

        let change = db
            .update_service(
                &fixture.service.id,
                UpdateServiceRequest { name: None, full_price: Some(2000) },
            )
            .await
            .unwrap();
        assert_eq!(detector.service_updated(&change).await, 2);
        queue.settle().await;

        let stats = queue.stats();
        assert_eq!(stats.recompute_runs, 2);
        assert_eq!(stats.comment_runs, 2);
        for id in [first.id, second.id] {
            let subscription = db.get_subscription(&id).await.unwrap();
            assert_eq!(subscription.price, Decimal::from(1800));
            assert!(subscription.commented_at().is_some());
        }
    }

    #[tokio::test]
    async fn test_plan_change_only_touches_its_subscriptions() {
        let db = DatabaseService::new();
        let (detector, queue) = detector(&db);
        let fixture = seed(&db, 1000, 10).await;
        let other = seed(&db, 500, 0).await;
        db.create_subscription(subscribe(&fixture)).await.unwrap();
        let untouched = db.create_subscription(subscribe(&other)).await.unwrap();

        let change = db
            .update_plan(
                &fixture.plan.id,
                UpdatePlanRequest { plan_type: None, discount_percent: Some(50) },
            )
            .await
            .unwrap();
        assert_eq!(detector.plan_updated(&change).await, 1);
        queue.settle().await;

        assert_eq!(queue.stats().recompute_runs, 1);
        let untouched = db.get_subscription(&untouched.id).await.unwrap();
        assert_eq!(untouched.price, Decimal::ZERO);
        assert!(untouched.comment.is_empty());
    }
}
