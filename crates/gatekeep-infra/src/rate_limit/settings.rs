//! Limiter settings loaded from environment variables.

use std::env;
use std::time::Duration;

use gatekeep_core::ports::RateLimitError;

use super::memory::DEFAULT_SWEEP_INTERVAL;

/// Redis connection configuration for the distributed store.
#[derive(Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Credential injected as the connection password, if set.
    pub token: Option<String>,
    /// Connection timeout at startup
    pub connect_timeout: Duration,
}

// Hand-written so the URL (which may embed a password) and the token stay
// out of logs.
impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("url", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Settings shared by both named limiters.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    /// Present when a distributed store is configured.
    pub redis: Option<RedisConfig>,
    /// Namespace for all Redis keys.
    pub key_prefix: String,
    /// How often the local store evicts expired entries.
    pub sweep_interval: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            redis: None,
            key_prefix: "gatekeep".to_string(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl RateLimitSettings {
    /// Load settings from environment variables.
    ///
    /// A credential without an endpoint, or a zero sweep interval, is a
    /// configuration error rather than a silent fallback.
    pub fn from_env() -> Result<Self, RateLimitError> {
        let url = non_empty_var("RATE_LIMIT_REDIS_URL").or_else(|| non_empty_var("REDIS_URL"));
        let token = non_empty_var("RATE_LIMIT_REDIS_TOKEN");

        let redis = match (url, token) {
            (Some(url), token) => Some(RedisConfig {
                url,
                token,
                connect_timeout: Duration::from_secs(
                    env::var("REDIS_CONNECT_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(5),
                ),
            }),
            (None, Some(_)) => {
                return Err(RateLimitError::Configuration(
                    "RATE_LIMIT_REDIS_TOKEN is set but no Redis URL is configured".to_string(),
                ));
            }
            (None, None) => None,
        };

        let sweep_interval = match env::var("RATE_LIMIT_SWEEP_INTERVAL_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(RateLimitError::Configuration(format!(
                        "RATE_LIMIT_SWEEP_INTERVAL_SECS must be a positive integer, got {raw:?}"
                    )));
                }
            },
            Err(_) => DEFAULT_SWEEP_INTERVAL,
        };

        Ok(Self {
            redis,
            key_prefix: non_empty_var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|| "gatekeep".to_string()),
            sweep_interval,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 6] = [
        "RATE_LIMIT_REDIS_URL",
        "REDIS_URL",
        "RATE_LIMIT_REDIS_TOKEN",
        "REDIS_CONNECT_TIMEOUT_SECS",
        "RATE_LIMIT_KEY_PREFIX",
        "RATE_LIMIT_SWEEP_INTERVAL_SECS",
    ];

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let mut all: Vec<(&str, Option<&str>)> = VARS.iter().map(|k| (*k, None)).collect();
        for (key, value) in vars {
            all.retain(|(k, _)| k != key);
            all.push((*key, Some(*value)));
        }
        temp_env::with_vars(all, f);
    }

    #[test]
    fn test_defaults_to_local() {
        with_env(&[], || {
            let settings = RateLimitSettings::from_env().unwrap();
            assert!(settings.redis.is_none());
            assert_eq!(settings.key_prefix, "gatekeep");
            assert_eq!(settings.sweep_interval, Duration::from_secs(300));
        });
    }

    #[test]
    fn test_redis_url_enables_distributed() {
        with_env(
            &[
                ("REDIS_URL", "redis://cache:6379"),
                ("RATE_LIMIT_REDIS_TOKEN", "s3cret"),
            ],
            || {
                let redis = RateLimitSettings::from_env().unwrap().redis.unwrap();
                assert_eq!(redis.url, "redis://cache:6379");
                assert_eq!(redis.token.as_deref(), Some("s3cret"));
                assert!(!format!("{redis:?}").contains("s3cret"));
            },
        );
    }

    #[test]
    fn test_dedicated_url_wins_over_shared() {
        with_env(
            &[
                ("REDIS_URL", "redis://shared:6379"),
                ("RATE_LIMIT_REDIS_URL", "redis://limits:6379"),
            ],
            || {
                let redis = RateLimitSettings::from_env().unwrap().redis.unwrap();
                assert_eq!(redis.url, "redis://limits:6379");
            },
        );
    }

    #[test]
    fn test_token_without_url_is_rejected() {
        with_env(&[("RATE_LIMIT_REDIS_TOKEN", "s3cret")], || {
            assert!(matches!(
                RateLimitSettings::from_env(),
                Err(RateLimitError::Configuration(_))
            ));
        });
    }

    #[test]
    fn test_zero_sweep_interval_is_rejected() {
        with_env(&[("RATE_LIMIT_SWEEP_INTERVAL_SECS", "0")], || {
            assert!(matches!(
                RateLimitSettings::from_env(),
                Err(RateLimitError::Configuration(_))
            ));
        });
    }
}
