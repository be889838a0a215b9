//! Domain-level error types.

use std::time::Duration;

use thiserror::Error;

/// A denied decision turned into an error at a handler boundary.
///
/// `check` never returns this itself; see `RateLimitDecision::into_result`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Rate limit exceeded, retry after {}s", retry_after.as_secs())]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
    pub limit: u32,
}
