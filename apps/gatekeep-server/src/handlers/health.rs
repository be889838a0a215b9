//! Health check endpoint.

use actix_web::{HttpResponse, web};
use gatekeep_core::domain::LimiterKind;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `local` or `distributed`.
    pub backend: String,
    pub timestamp: String,
}

/// Health check endpoint - returns server status.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.limiters.get(LimiterKind::Auth).backend().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, test};
    use gatekeep_core::domain::SystemClock;
    use gatekeep_infra::{FailurePolicy, Limiters, StoreFactory};
    use std::sync::Arc;
    use std::time::Duration;

    #[actix_web::test]
    async fn test_health_reports_backend() {
        let factory = StoreFactory::local(Arc::new(SystemClock), Duration::from_secs(300));
        let state = AppState::new(Limiters::from_factory(&factory), FailurePolicy::Closed);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "local");
    }
}
