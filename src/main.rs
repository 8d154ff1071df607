use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;

use subscription_pricing::{config::Config, handlers, services::subscription::SubscriptionService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let subscription_service = SubscriptionService::new(&config.pricing);

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!(
        "Starting subscription pricing server on {} ({} task workers, cache key {})",
        bind_address,
        config.pricing.task_workers,
        config.pricing.price_cache_key
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(web::Data::new(subscription_service.clone()))
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
