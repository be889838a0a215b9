//! Limiter handlers: check, reset and stats for a named limiter.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use gatekeep_core::domain::LimiterKind;
use gatekeep_shared::dto::{DecisionResponse, IdentifierRequest, StatsResponse};

use crate::middleware::client_identity::ClientIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LimiterPath {
    kind: LimiterKind,
}

/// Identifier from the body when given, otherwise from the proxy headers.
fn resolve_identifier(
    body: Option<web::Json<IdentifierRequest>>,
    client: ClientIdentity,
) -> String {
    body.and_then(|b| b.into_inner().identifier)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or(client.0)
}

/// POST /api/limits/{kind}/check
pub async fn check(
    state: web::Data<AppState>,
    path: web::Path<LimiterPath>,
    client: ClientIdentity,
    body: Option<web::Json<IdentifierRequest>>,
) -> AppResult<HttpResponse> {
    let identifier = resolve_identifier(body, client);
    let limiter = state.limiters.get(path.kind);

    let decision = limiter
        .check_with_policy(&identifier, state.failure_policy)
        .await?
        .into_result()?;

    Ok(HttpResponse::Ok()
        .insert_header(("X-RateLimit-Limit", decision.limit.to_string()))
        .insert_header(("X-RateLimit-Remaining", decision.remaining.to_string()))
        .insert_header(("X-RateLimit-Reset", decision.reset_at.timestamp().to_string()))
        .json(DecisionResponse {
            allowed: decision.allowed,
            limit: decision.limit,
            remaining: decision.remaining,
            reset_at: decision.reset_at,
        }))
}

/// POST /api/limits/{kind}/reset
///
/// Always 204: a reset that fails leaves the identifier to expire on its own.
pub async fn reset(
    state: web::Data<AppState>,
    path: web::Path<LimiterPath>,
    client: ClientIdentity,
    body: Option<web::Json<IdentifierRequest>>,
) -> HttpResponse {
    let identifier = resolve_identifier(body, client);

    if let Err(e) = state.limiters.get(path.kind).reset(&identifier).await {
        tracing::warn!(limiter = %path.kind, error = %e, "Rate limit reset failed");
    }

    HttpResponse::NoContent().finish()
}

/// GET /api/limits/{kind}/stats
pub async fn stats(
    state: web::Data<AppState>,
    path: web::Path<LimiterPath>,
) -> AppResult<HttpResponse> {
    let limiter = state.limiters.get(path.kind);
    let stats = limiter.stats().await?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        limiter: path.kind.to_string(),
        backend: limiter.backend().to_string(),
        total_tracked: stats.total_tracked,
        currently_limited: stats.currently_limited,
        exact: stats.exact,
    }))
}
