use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;

use crate::models::plan::PlanType;

/// Binds a client to a service under a plan.
///
/// `price` and `comment` are derived fields. They are filled in by the
/// background tasks and lag behind edits of the referenced service or plan
/// until those tasks have run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub plan_id: Uuid,
    pub price: Decimal,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub plan_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionDetails {
    pub id: Uuid,
    pub client_name: String,
    pub service_name: String,
    pub plan_type: PlanType,
    pub discount_percent: u32,
    pub price: Decimal,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionListResponse {
    pub subscriptions: Vec<SubscriptionDetails>,
    pub total_amount: Decimal,
}

impl Subscription {
    pub fn new(request: CreateSubscriptionRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            service_id: request.service_id,
            plan_id: request.plan_id,
            price: Decimal::ZERO,
            comment: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn commented_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.comment)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Stamps the comment with `now`, nudged forward by a microsecond when the
    /// clock has not advanced past the previous stamp.
    pub fn stamp_comment(&mut self, now: DateTime<Utc>) {
        let now = now.trunc_subsecs(6);
        let stamp = match self.commented_at() {
            Some(previous) if now <= previous => previous + Duration::microseconds(1),
            _ => now,
        };
        self.comment = stamp.to_rfc3339_opts(SecondsFormat::Micros, true);
    }
}
