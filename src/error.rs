use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use uuid::Uuid;

use crate::models::common::ApiResponse;

pub type Result<T> = std::result::Result<T, PricingError>;

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{entity} {id} is still referenced by {dependents} subscription(s)")]
    Protected {
        entity: &'static str,
        id: Uuid,
        dependents: usize,
    },
}

impl PricingError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        PricingError::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PricingError::NotFound { .. })
    }
}

impl ResponseError for PricingError {
    fn status_code(&self) -> StatusCode {
        match self {
            PricingError::NotFound { .. } => StatusCode::NOT_FOUND,
            PricingError::Validation(_) => StatusCode::BAD_REQUEST,
            PricingError::Protected { .. } => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            PricingError::not_found("subscription", id).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PricingError::Protected { entity: "service", id, dependents: 2 }.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_not_found_message_names_entity() {
        let id = Uuid::new_v4();
        let err = PricingError::not_found("plan", id);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), format!("plan {} not found", id));
    }
}
