mod config;
mod error;
mod model;
mod routes;
mod upload;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};

use config::AppConfig;
use model::classifier::Classifier;
use model::provisioner::ensure_model_present;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = AppConfig::from_env();

    if let Err(e) = ensure_model_present(&config.model_path, &config.model_remote_url).await {
        log::error!("Failed to provision model artifact: {e}");
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Model provisioning failed: {e}"),
        ));
    }

    let classifier = match Classifier::load(&config.model_path) {
        Ok(classifier) => classifier,
        Err(e) => {
            log::error!("Failed to load model at startup: {e}");
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Model loading failed: {e}"),
            ));
        }
    };
    log::info!("Model loaded from {}", config.model_path.display());

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    let frontend_dir = config.frontend_dir.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
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
            .app_data(web::Data::new(classifier.clone()))
            .app_data(web::Data::new(config.clone()))
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
