//! Application configuration loaded from environment variables.

use std::env;

use gatekeep_core::ports::RateLimitError;
use gatekeep_infra::{FailurePolicy, RateLimitSettings};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit: RateLimitSettings,
    /// What to do when the counter store is unreachable.
    pub failure_policy: FailurePolicy,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, RateLimitError> {
        let failure_policy = match env::var("RATE_LIMIT_FAIL_OPEN") {
            Ok(v) if v == "true" || v == "1" => FailurePolicy::Open,
            _ => FailurePolicy::Closed,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            rate_limit: RateLimitSettings::from_env()?,
            failure_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_closed_unless_opted_out() {
        temp_env::with_vars(
            [
                ("RATE_LIMIT_FAIL_OPEN", None::<&str>),
                ("RATE_LIMIT_REDIS_TOKEN", None),
                ("RATE_LIMIT_SWEEP_INTERVAL_SECS", None),
            ],
            || {
                let config = AppConfig::from_env().unwrap();
                assert_eq!(config.failure_policy, FailurePolicy::Closed);
            },
        );

        temp_env::with_vars(
            [
                ("RATE_LIMIT_FAIL_OPEN", Some("true")),
                ("RATE_LIMIT_REDIS_TOKEN", None),
                ("RATE_LIMIT_SWEEP_INTERVAL_SECS", None),
            ],
            || {
                let config = AppConfig::from_env().unwrap();
                assert_eq!(config.failure_policy, FailurePolicy::Open);
            },
        );
    }

    #[test]
    fn test_misconfigured_store_is_an_error() {
        temp_env::with_vars(
            [
                ("RATE_LIMIT_REDIS_URL", None::<&str>),
                ("REDIS_URL", None),
                ("RATE_LIMIT_REDIS_TOKEN", Some("s3cret")),
            ],
            || {
                assert!(matches!(
                    AppConfig::from_env(),
                    Err(RateLimitError::Configuration(_))
                ));
            },
        );
    }
}
