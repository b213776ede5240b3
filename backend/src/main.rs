mod advice;
mod config;
mod inference;
mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

use advice::AdviceTable;
use config::Config;
use inference::model::Classifier;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = std::env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = Config::from_env();
    log::info!("Configuration: {:?}", config);

    // The advice table is a startup resource; the service refuses to start
    // without full class coverage.
    let advice = AdviceTable::load(&config.advice_path).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Advice table loading failed: {}", e),
        )
    })?;

    // A missing model is not fatal: uploads and the informational endpoints
    // keep working, and prediction requests report the model as unavailable.
    let model = Classifier::load(&config.model_path);
    if !model.is_ready() {
        log::warn!("Starting without a usable model; prediction requests will be rejected");
    }

    let bind_address = config.bind_address.clone();
    let static_dir = config.static_dir.clone();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(model.clone()))
            .app_data(web::Data::new(advice.clone()))
            .app_data(web::Data::new(config.clone()))
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
