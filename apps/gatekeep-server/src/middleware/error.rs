//! Error handling - RFC 7807 compliant responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use gatekeep_core::RateLimitExceeded;
use gatekeep_core::ports::RateLimitError;
use gatekeep_shared::ErrorResponse;
use std::fmt;

/// Seconds a client is told to wait when the limiter fails closed.
const STORE_UNAVAILABLE_RETRY_SECS: u64 = 30;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    TooManyRequests { retry_after_secs: u64, limit: u32 },
    /// The limiter could not decide and denied the attempt.
    ServiceUnavailable,
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::TooManyRequests {
                retry_after_secs, ..
            } => write!(f, "Too many requests, retry after {}s", retry_after_secs),
            AppError::ServiceUnavailable => write!(f, "Service unavailable"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::TooManyRequests {
                retry_after_secs,
                limit,
            } => HttpResponse::build(self.status_code())
                .insert_header(("Retry-After", retry_after_secs.to_string()))
                .insert_header(("X-RateLimit-Limit", limit.to_string()))
                .insert_header(("X-RateLimit-Remaining", "0"))
                .json(ErrorResponse::too_many_requests(*retry_after_secs)),
            AppError::ServiceUnavailable => HttpResponse::build(self.status_code())
                .insert_header(("Retry-After", STORE_UNAVAILABLE_RETRY_SECS.to_string()))
                .json(ErrorResponse::service_unavailable()),
            AppError::Internal(detail) => {
                // Log internal errors
                tracing::error!("Internal error: {}", detail);
                HttpResponse::build(self.status_code()).json(ErrorResponse::internal_error())
            }
        }
    }
}

impl From<RateLimitExceeded> for AppError {
    fn from(err: RateLimitExceeded) -> Self {
        let secs = err.retry_after.as_secs();
        let retry_after_secs = if err.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };

        AppError::TooManyRequests {
            retry_after_secs: retry_after_secs.max(1),
            limit: err.limit,
        }
    }
}

// Store details stay in the logs, never in the response body.
impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::StoreUnavailable(msg) => {
                tracing::error!("Counter store unavailable, failing closed: {}", msg);
                AppError::ServiceUnavailable
            }
            RateLimitError::Configuration(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_retry_after_rounds_up() {
        let err = AppError::from(RateLimitExceeded {
            retry_after: Duration::from_millis(899_001),
            limit: 5,
        });
        assert!(matches!(
            err,
            AppError::TooManyRequests {
                retry_after_secs: 900,
                limit: 5
            }
        ));

        let err = AppError::from(RateLimitExceeded {
            retry_after: Duration::ZERO,
            limit: 5,
        });
        assert!(matches!(err, AppError::TooManyRequests { retry_after_secs: 1, .. }));
    }

    #[test]
    fn test_store_failure_hides_details() {
        let err = AppError::from(RateLimitError::StoreUnavailable(
            "redis://10.0.0.3:6379 refused".to_string(),
        ));
        let resp = err.error_response();

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers().get("Retry-After").unwrap(), "30");
    }
}
