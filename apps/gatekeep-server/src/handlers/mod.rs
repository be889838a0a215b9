//! HTTP handlers and route configuration.

mod health;
mod limits;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            // Limiter routes, `{kind}` is `auth` or `registration`
            .service(
                web::scope("/limits/{kind}")
                    .route("/check", web::post().to(limits::check))
                    .route("/reset", web::post().to(limits::reset))
                    .route("/stats", web::get().to(limits::stats)),
            ),
    );
}
