use actix_web::{delete, get, post, HttpResponse};
use actix_web::web::{Data, Json, Path};
use uuid::Uuid;

use crate::error::PricingError;
use crate::models::{client::CreateClientRequest, common::ApiResponse};
use crate::services::subscription::SubscriptionService;

#[post("")]
pub async fn create_client(
    app: Data<SubscriptionService>,
    payload: Json<CreateClientRequest>,
) -> Result<HttpResponse, PricingError> {
    let client = app.db().create_client(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(client)))
}

#[get("")]
pub async fn list_clients(app: Data<SubscriptionService>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(app.db().list_clients().await))
}

#[get("/{client_id}")]
pub async fn get_client(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, PricingError> {
    let client = app.db().get_client(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(client)))
}

#[delete("/{client_id}")]
pub async fn delete_client(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, PricingError> {
    let client = app.db().delete_client(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        client,
        "Client deleted".to_string(),
    )))
}
