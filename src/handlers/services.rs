use actix_web::{delete, get, patch, post, HttpResponse};
use actix_web::web::{Data, Json, Path};
use uuid::Uuid;

use crate::error::PricingError;
use crate::models::{
    common::ApiResponse,
    service::{CreateServiceRequest, UpdateServiceRequest},
};
use crate::services::subscription::SubscriptionService;

#[post("")]
pub async fn create_service(
    app: Data<SubscriptionService>,
    payload: Json<CreateServiceRequest>,
) -> Result<HttpResponse, PricingError> {
    let service = app.db().create_service(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(service)))
}

#[get("")]
pub async fn list_services(app: Data<SubscriptionService>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(app.db().list_services().await))
}

#[get("/{service_id}")]
pub async fn get_service(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, PricingError> {
    let service = app.db().get_service(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(service)))
}

/// Price edits are answered immediately; dependent subscriptions settle in the background.
#[patch("/{service_id}")]
pub async fn update_service(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
    payload: Json<UpdateServiceRequest>,
) -> Result<HttpResponse, PricingError> {
    let service = app.update_service(&path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(service)))
}

#[delete("/{service_id}")]
pub async fn delete_service(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, PricingError> {
    let service = app.db().delete_service(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        service,
        "Service deleted".to_string(),
    )))
}
