use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// A billable service with its undiscounted price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub full_price: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,

    pub full_price: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: Option<String>,

    pub full_price: Option<u32>,
}

/// A committed edit of a service row, as seen before and after the write.
#[derive(Debug, Clone)]
pub struct ServiceChange {
    pub before: Service,
    pub after: Service,
}

impl ServiceChange {
    pub fn full_price_changed(&self) -> bool {
        self.before.full_price != self.after.full_price
    }
}

impl Service {
    pub fn new(request: CreateServiceRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: request.name,
            full_price: request.full_price,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, request: UpdateServiceRequest) {
        if let Some(name) = request.name {
            self.name = name;
        }
        if let Some(full_price) = request.full_price {
            self.full_price = full_price;
        }
        self.updated_at = Utc::now();
    }
}
