use actix_web::{delete, get, post, HttpResponse};
use actix_web::web::{Data, Json, Path};
use uuid::Uuid;

use crate::error::PricingError;
use crate::models::{common::ApiResponse, subscription::CreateSubscriptionRequest};
use crate::services::subscription::SubscriptionService;

#[post("")]
pub async fn create_subscription(
    app: Data<SubscriptionService>,
    payload: Json<CreateSubscriptionRequest>,
) -> Result<HttpResponse, PricingError> {
    let subscription = app.create_subscription(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(subscription)))
}

#[get("")]
pub async fn list_subscriptions(app: Data<SubscriptionService>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(app.list_subscriptions().await))
}

#[get("/{subscription_id}")]
pub async fn get_subscription(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, PricingError> {
    let subscription = app.db().get_subscription(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(subscription)))
}

#[delete("/{subscription_id}")]
pub async fn delete_subscription(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, PricingError> {
    let subscription = app.delete_subscription(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        subscription,
        "Subscription deleted".to_string(),
    )))
}
