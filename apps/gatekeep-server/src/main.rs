//! # Gatekeep Server
//!
//! HTTP front for the authentication and registration rate limiters.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    // A bad store configuration stops startup
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::io::Error::other(e)
    })?;

    tracing::info!(
        "Starting Gatekeep server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::init(&config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize rate limiters");
        std::io::Error::other(e)
    })?;

    let app_state = state.clone();
    let result = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(app_state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    state.limiters.shutdown();
    tracing::info!("Gatekeep server stopped");

    result
}
