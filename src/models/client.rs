use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// The party a subscription is billed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub company_name: String,
    pub full_address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Company name must be between 1 and 100 characters"
    ))]
    pub company_name: String,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Address must be between 1 and 100 characters"
    ))]
    pub full_address: String,
}

impl Client {
    pub fn new(request: CreateClientRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_name: request.company_name,
            full_address: request.full_address,
            created_at: Utc::now(),
        }
    }
}
