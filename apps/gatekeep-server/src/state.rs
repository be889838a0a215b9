//! Application state - shared across all handlers.

use std::sync::Arc;

use gatekeep_core::domain::SystemClock;
use gatekeep_core::ports::RateLimitError;
use gatekeep_infra::{FailurePolicy, Limiters};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub limiters: Limiters,
    pub failure_policy: FailurePolicy,
}

impl AppState {
    pub fn new(limiters: Limiters, failure_policy: FailurePolicy) -> Self {
        Self {
            limiters,
            failure_policy,
        }
    }

    /// Build the limiters on the backend the configuration selects.
    ///
    /// A misconfigured or unreachable distributed store fails here, before
    /// any traffic is served.
    pub async fn init(config: &AppConfig) -> Result<Self, RateLimitError> {
        let limiters = Limiters::from_settings(&config.rate_limit, Arc::new(SystemClock)).await?;

        tracing::info!(
            backend = %limiters.get(gatekeep_core::domain::LimiterKind::Auth).backend(),
            failure_policy = ?config.failure_policy,
            "Application state initialized"
        );

        Ok(Self::new(limiters, config.failure_policy))
    }
}
