use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, Semaphore};
use uuid::Uuid;

use crate::error::Result;
use crate::services::database::DatabaseService;
use crate::services::invalidator::CacheInvalidator;
use crate::services::pricing::calculate_price;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    RecomputePrice,
    RefreshComment,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::RecomputePrice => write!(f, "recompute_price"),
            TaskKind::RefreshComment => write!(f, "refresh_comment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// A new execution was started.
    Spawned,
    /// An execution for the same key is in flight; it will run once more when done.
    Collapsed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub recompute_runs: u64,
    pub comment_runs: u64,
    pub collapsed: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    recompute_runs: AtomicU64,
    comment_runs: AtomicU64,
    collapsed: AtomicU64,
    failed: AtomicU64,
}

type TaskKey = (TaskKind, Uuid);

struct QueueInner {
    db: DatabaseService,
    invalidator: CacheInvalidator,
    workers: Semaphore,
    /// In-flight keys mapped to their "run again" flag.
    in_flight: Mutex<HashMap<TaskKey, bool>>,
    idle: Notify,
    counters: Counters,
}

/// Runs price and comment tasks in the background, one at a time per subscription and kind.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

impl TaskQueue {
    pub fn new(db: DatabaseService, invalidator: CacheInvalidator, max_workers: usize) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                db,
                invalidator,
                workers: Semaphore::new(max_workers.max(1)),
                in_flight: Mutex::new(HashMap::new()),
                idle: Notify::new(),
                counters: Counters::default(),
            }),
        }
    }

    /// Schedules `kind` for a subscription without waiting for it to run.
    pub async fn enqueue(&self, kind: TaskKind, subscription_id: Uuid) -> Enqueued {
        let key = (kind, subscription_id);
        {
            let mut in_flight = self.inner.in_flight.lock().await;
            if let Some(rerun) = in_flight.get_mut(&key) {
                *rerun = true;
                self.inner.counters.collapsed.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "{} for subscription {} already in flight, collapsed",
                    kind,
                    subscription_id
                );
                return Enqueued::Collapsed;
            }
            in_flight.insert(key, false);
        }

        tokio::spawn(drive(self.inner.clone(), key));
        Enqueued::Spawned
    }

    /// Waits until no task is in flight.
    pub async fn settle(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.inner.in_flight.lock().await.is_empty() {
                return;
            }
            idle.await;
        }
    }

    pub async fn is_in_flight(&self, kind: TaskKind, subscription_id: Uuid) -> bool {
        self.inner.in_flight.lock().await.contains_key(&(kind, subscription_id))
    }

    pub fn stats(&self) -> TaskStats {
        let counters = &self.inner.counters;
        TaskStats {
            recompute_runs: counters.recompute_runs.load(Ordering::Relaxed),
            comment_runs: counters.comment_runs.load(Ordering::Relaxed),
            collapsed: counters.collapsed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }
}

async fn drive(inner: Arc<QueueInner>, key: TaskKey) {
    let (kind, subscription_id) = key;
    loop {
        // Set when the row is gone; a rerun would only fail the same way.
        let mut gone = false;
        match inner.workers.acquire().await {
            Ok(_permit) => {
                let outcome = match kind {
                    TaskKind::RecomputePrice => {
                        inner.counters.recompute_runs.fetch_add(1, Ordering::Relaxed);
                        recompute_price(&inner.db, &inner.invalidator, subscription_id)
                            .await
                            .map(|price| format!("price {}", price))
                    }
                    TaskKind::RefreshComment => {
                        inner.counters.comment_runs.fetch_add(1, Ordering::Relaxed);
                        refresh_comment(&inner.db, subscription_id)
                            .await
                            .map(|comment| format!("comment {}", comment))
                    }
                };

                match outcome {
                    Ok(result) => {
                        log::debug!(
                            "{} for subscription {} done: {}",
                            kind,
                            subscription_id,
                            result
                        );
                    }
                    Err(e) => {
                        inner.counters.failed.fetch_add(1, Ordering::Relaxed);
                        gone = e.is_not_found();
                        log::error!("{} for subscription {} failed: {}", kind, subscription_id, e);
                    }
                }
            }
            Err(e) => {
                log::error!("{} for subscription {} not run: {}", kind, subscription_id, e);
            }
        }

        let mut in_flight = inner.in_flight.lock().await;
        match in_flight.get_mut(&key) {
            Some(rerun) if *rerun && !gone => {
                *rerun = false;
            }
            _ => {
                in_flight.remove(&key);
                break;
            }
        }
    }

    inner.idle.notify_waiters();
}

/// Recomputes and stores the price of one subscription, then evicts the cached total.
pub async fn recompute_price(
    db: &DatabaseService,
    invalidator: &CacheInvalidator,
    subscription_id: Uuid,
) -> Result<Decimal> {
    let mut tx = db.lock_subscription(subscription_id).await?;
    let inputs = tx.pricing_inputs().await?;
    let price = calculate_price(inputs.full_price, inputs.discount_percent);
    tx.subscription_mut().price = price;
    tx.commit().await?;

    invalidator.invalidate().await;
    Ok(price)
}

/// Stamps the subscription's audit comment with the current time.
pub async fn refresh_comment(db: &DatabaseService, subscription_id: Uuid) -> Result<String> {
    let mut tx = db.lock_subscription(subscription_id).await?;
    tx.subscription_mut().stamp_comment(Utc::now());
    let subscription = tx.commit().await?;
    Ok(subscription.comment)
}
