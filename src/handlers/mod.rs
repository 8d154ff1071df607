pub mod clients;
pub mod health;
pub mod plans;
pub mod services;
pub mod subscriptions;

use actix_web::web;

/// Mounts every route under `/api/v1`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::scope("/clients")
                    .service(clients::create_client)
                    .service(clients::list_clients)
                    .service(clients::get_client)
                    .service(clients::delete_client),
            )
            .service(
                web::scope("/services")
                    .service(services::create_service)
                    .service(services::list_services)
                    .service(services::get_service)
                    .service(services::update_service)
                    .service(services::delete_service),
            )
            .service(
                web::scope("/plans")
                    .service(plans::create_plan)
                    .service(plans::list_plans)
                    .service(plans::get_plan)
                    .service(plans::update_plan)
                    .service(plans::delete_plan),
            )
            .service(
                web::scope("/subscriptions")
                    .service(subscriptions::create_subscription)
                    .service(subscriptions::list_subscriptions)
                    .service(subscriptions::get_subscription)
                    .service(subscriptions::delete_subscription),
            )
            .route("/health", web::get().to(health::health_check)),
    );
}
