use actix_web::{delete, get, patch, post, HttpResponse};
use actix_web::web::{Data, Json, Path};
use uuid::Uuid;

use crate::error::PricingError;
use crate::models::{
    common::ApiResponse,
    plan::{CreatePlanRequest, UpdatePlanRequest},
};
use crate::services::subscription::SubscriptionService;

#[post("")]
pub async fn create_plan(
    app: Data<SubscriptionService>,
    payload: Json<CreatePlanRequest>,
) -> Result<HttpResponse, PricingError> {
    let plan = app.db().create_plan(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(plan)))
}

#[get("")]
pub async fn list_plans(app: Data<SubscriptionService>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(app.db().list_plans().await))
}

#[get("/{plan_id}")]
pub async fn get_plan(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, PricingError> {
    let plan = app.db().get_plan(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(plan)))
}

#[patch("/{plan_id}")]
pub async fn update_plan(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
    payload: Json<UpdatePlanRequest>,
) -> Result<HttpResponse, PricingError> {
    let plan = app.update_plan(&path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(plan)))
}

#[delete("/{plan_id}")]
pub async fn delete_plan(
    app: Data<SubscriptionService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, PricingError> {
    let plan = app.db().delete_plan(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        plan,
        "Plan deleted".to_string(),
    )))
}
