use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;
use validator::Validate;

use crate::error::{PricingError, Result};
use crate::models::{
    client::{Client, CreateClientRequest},
    plan::{CreatePlanRequest, Plan, PlanChange, UpdatePlanRequest},
    service::{CreateServiceRequest, Service, ServiceChange, UpdateServiceRequest},
    subscription::{CreateSubscriptionRequest, Subscription, SubscriptionDetails},
};

/// Observer run by [`DatabaseService::delete_subscription`] once the row is gone.
#[async_trait]
pub trait SubscriptionDeletionHook: Send + Sync {
    async fn subscription_deleted(&self, subscription: &Subscription);
}

#[derive(Default)]
struct Tables {
    clients: HashMap<Uuid, Client>,
    services: HashMap<Uuid, Service>,
    plans: HashMap<Uuid, Plan>,
    subscriptions: HashMap<Uuid, Subscription>,
}

impl Tables {
    fn count_subscriptions(&self, matches: impl Fn(&Subscription) -> bool) -> usize {
        self.subscriptions.values().filter(|s| matches(*s)).count()
    }
}

/// The two inputs a subscription price is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingInputs {
    pub full_price: u32,
    pub discount_percent: u32,
}

/// In-process pricing store.
///
/// Writes to a single subscription row are serialized through a per-row lock,
/// see [`DatabaseService::lock_subscription`].
#[derive(Clone, Default)]
pub struct DatabaseService {
    tables: Arc<RwLock<Tables>>,
    row_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
    deletion_hooks: Arc<Vec<Arc<dyn SubscriptionDeletionHook>>>,
}

impl DatabaseService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deletion_hook(mut self, hook: Arc<dyn SubscriptionDeletionHook>) -> Self {
        Arc::make_mut(&mut self.deletion_hooks).push(hook);
        self
    }

    // Client operations
    pub async fn create_client(&self, request: CreateClientRequest) -> Result<Client> {
        request.validate()?;
        let client = Client::new(request);
        self.tables.write().await.clients.insert(client.id, client.clone());
        log::debug!("Created client {}", client.id);
        Ok(client)
    }

    pub async fn get_client(&self, client_id: &Uuid) -> Result<Client> {
        self.tables
            .read()
            .await
            .clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| PricingError::not_found("client", *client_id))
    }

    pub async fn list_clients(&self) -> Vec<Client> {
        let mut clients: Vec<Client> = self.tables.read().await.clients.values().cloned().collect();
        clients.sort_by_key(|c| c.created_at);
        clients
    }

    pub async fn delete_client(&self, client_id: &Uuid) -> Result<Client> {
        let mut tables = self.tables.write().await;
        let dependents = tables.count_subscriptions(|s| s.client_id == *client_id);
        if dependents > 0 {
            return Err(PricingError::Protected { entity: "client", id: *client_id, dependents });
        }
        tables
            .clients
            .remove(client_id)
            .ok_or_else(|| PricingError::not_found("client", *client_id))
    }

    // Service operations
    pub async fn create_service(&self, request: CreateServiceRequest) -> Result<Service> {
        request.validate()?;
        let service = Service::new(request);
        self.tables.write().await.services.insert(service.id, service.clone());
        log::debug!("Created service {} priced at {}", service.id, service.full_price);
        Ok(service)
    }

    pub async fn get_service(&self, service_id: &Uuid) -> Result<Service> {
        self.tables
            .read()
            .await
            .services
            .get(service_id)
            .cloned()
            .ok_or_else(|| PricingError::not_found("service", *service_id))
    }

    pub async fn list_services(&self) -> Vec<Service> {
        let mut services: Vec<Service> =
            self.tables.read().await.services.values().cloned().collect();
        services.sort_by_key(|s| s.created_at);
        services
    }

    /// Applies and commits the edit, returning the row as it was before and after.
    pub async fn update_service(
        &self,
        service_id: &Uuid,
        request: UpdateServiceRequest,
    ) -> Result<ServiceChange> {
        request.validate()?;
        let mut tables = self.tables.write().await;
        let service = tables
            .services
            .get_mut(service_id)
            .ok_or_else(|| PricingError::not_found("service", *service_id))?;

        let before = service.clone();
        service.apply(request);
        Ok(ServiceChange { before, after: service.clone() })
    }

    pub async fn delete_service(&self, service_id: &Uuid) -> Result<Service> {
        let mut tables = self.tables.write().await;
        let dependents = tables.count_subscriptions(|s| s.service_id == *service_id);
        if dependents > 0 {
            return Err(PricingError::Protected { entity: "service", id: *service_id, dependents });
        }
        tables
            .services
            .remove(service_id)
            .ok_or_else(|| PricingError::not_found("service", *service_id))
    }

    // Plan operations
    pub async fn create_plan(&self, request: CreatePlanRequest) -> Result<Plan> {
        request.validate()?;
        let plan = Plan::new(request);
        self.tables.write().await.plans.insert(plan.id, plan.clone());
        log::debug!(
            "Created {} plan {} with {}% discount",
            plan.plan_type,
            plan.id,
            plan.discount_percent
        );
        Ok(plan)
    }

    pub async fn get_plan(&self, plan_id: &Uuid) -> Result<Plan> {
        self.tables
            .read()
            .await
            .plans
            .get(plan_id)
            .cloned()
            .ok_or_else(|| PricingError::not_found("plan", *plan_id))
    }

    pub async fn list_plans(&self) -> Vec<Plan> {
        let mut plans: Vec<Plan> = self.tables.read().await.plans.values().cloned().collect();
        plans.sort_by_key(|p| p.created_at);
        plans
    }

    pub async fn update_plan(
        &self,
        plan_id: &Uuid,
        request: UpdatePlanRequest,
    ) -> Result<PlanChange> {
        request.validate()?;
        let mut tables = self.tables.write().await;
        let plan = tables
            .plans
            .get_mut(plan_id)
            .ok_or_else(|| PricingError::not_found("plan", *plan_id))?;

        let before = plan.clone();
        plan.apply(request);
        Ok(PlanChange { before, after: plan.clone() })
    }

    pub async fn delete_plan(&self, plan_id: &Uuid) -> Result<Plan> {
        let mut tables = self.tables.write().await;
        let dependents = tables.count_subscriptions(|s| s.plan_id == *plan_id);
        if dependents > 0 {
            return Err(PricingError::Protected { entity: "plan", id: *plan_id, dependents });
        }
        tables
            .plans
            .remove(plan_id)
            .ok_or_else(|| PricingError::not_found("plan", *plan_id))
    }

    // Subscription operations
    pub async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<Subscription> {
        let mut tables = self.tables.write().await;
        if !tables.clients.contains_key(&request.client_id) {
            return Err(PricingError::not_found("client", request.client_id));
        }
        if !tables.services.contains_key(&request.service_id) {
            return Err(PricingError::not_found("service", request.service_id));
        }
        if !tables.plans.contains_key(&request.plan_id) {
            return Err(PricingError::not_found("plan", request.plan_id));
        }

        let subscription = Subscription::new(request);
        tables.subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    pub async fn get_subscription(&self, subscription_id: &Uuid) -> Result<Subscription> {
        self.tables
            .read()
            .await
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| PricingError::not_found("subscription", *subscription_id))
    }

    /// Subscriptions joined with their client, service and plan, oldest first.
    pub async fn list_subscription_details(&self) -> Vec<SubscriptionDetails> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Subscription> = tables.subscriptions.values().collect();
        rows.sort_by_key(|s| s.created_at);

        rows.into_iter()
            .filter_map(|s| {
                let client = tables.clients.get(&s.client_id)?;
                let service = tables.services.get(&s.service_id)?;
                let plan = tables.plans.get(&s.plan_id)?;
                Some(SubscriptionDetails {
                    id: s.id,
                    client_name: client.company_name.clone(),
                    service_name: service.name.clone(),
                    plan_type: plan.plan_type,
                    discount_percent: plan.discount_percent,
                    price: s.price,
                    comment: s.comment.clone(),
                })
            })
            .collect()
    }

    pub async fn subscription_ids_for_service(&self, service_id: &Uuid) -> Vec<Uuid> {
        self.tables
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| s.service_id == *service_id)
            .map(|s| s.id)
            .collect()
    }

    pub async fn subscription_ids_for_plan(&self, plan_id: &Uuid) -> Vec<Uuid> {
        self.tables
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| s.plan_id == *plan_id)
            .map(|s| s.id)
            .collect()
    }

    /// Removes the row under its row lock, then runs the deletion hooks.
    pub async fn delete_subscription(&self, subscription_id: &Uuid) -> Result<Subscription> {
        let transaction = self.lock_subscription(*subscription_id).await?;

        let deleted = self
            .tables
            .write()
            .await
            .subscriptions
            .remove(subscription_id)
            .ok_or_else(|| PricingError::not_found("subscription", *subscription_id))?;
        self.row_locks.lock().await.remove(subscription_id);
        drop(transaction);

        log::info!("Deleted subscription {}", deleted.id);
        for hook in self.deletion_hooks.iter() {
            hook.subscription_deleted(&deleted).await;
        }
        Ok(deleted)
    }

    /// Sum of every stored subscription price.
    pub async fn total_price(&self) -> Decimal {
        self.tables
            .read()
            .await
            .subscriptions
            .values()
            .map(|s| s.price)
            .sum()
    }

    /// Takes the exclusive row lock for a subscription and opens a transaction on it.
    ///
    /// Waits while another transaction holds the lock. Fails with `NotFound`
    /// if the row does not exist, or was deleted while waiting.
    pub async fn lock_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<SubscriptionTransaction> {
        let row_lock = {
            let tables = self.tables.read().await;
            if !tables.subscriptions.contains_key(&subscription_id) {
                return Err(PricingError::not_found("subscription", subscription_id));
            }
            let mut row_locks = self.row_locks.lock().await;
            row_locks
                .entry(subscription_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let guard = row_lock.lock_owned().await;
        let row = self.get_subscription(&subscription_id).await?;

        Ok(SubscriptionTransaction {
            db: self.clone(),
            row,
            _guard: guard,
        })
    }
}

/// Exclusive, uncommitted view of one subscription row.
///
/// Changes are made to a private copy and only become visible on
/// [`commit`](SubscriptionTransaction::commit). Dropping the transaction
/// discards them and releases the row lock.
pub struct SubscriptionTransaction {
    db: DatabaseService,
    row: Subscription,
    _guard: OwnedMutexGuard<()>,
}

impl SubscriptionTransaction {
    pub fn subscription(&self) -> &Subscription {
        &self.row
    }

    pub fn subscription_mut(&mut self) -> &mut Subscription {
        &mut self.row
    }

    /// Reads the current full price and discount referenced by the row.
    pub async fn pricing_inputs(&self) -> Result<PricingInputs> {
        let tables = self.db.tables.read().await;
        let service = tables
            .services
            .get(&self.row.service_id)
            .ok_or_else(|| PricingError::not_found("service", self.row.service_id))?;
        let plan = tables
            .plans
            .get(&self.row.plan_id)
            .ok_or_else(|| PricingError::not_found("plan", self.row.plan_id))?;

        Ok(PricingInputs {
            full_price: service.full_price,
            discount_percent: plan.discount_percent,
        })
    }

    pub async fn commit(self) -> Result<Subscription> {
        let SubscriptionTransaction { db, mut row, _guard } = self;
        row.updated_at = Utc::now();

        let mut tables = db.tables.write().await;
        let stored = tables
            .subscriptions
            .get_mut(&row.id)
            .ok_or_else(|| PricingError::not_found("subscription", row.id))?;
        *stored = row.clone();
        Ok(row)
    }
}
