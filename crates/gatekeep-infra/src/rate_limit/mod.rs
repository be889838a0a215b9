//! Rate limiting implementations and backend selection.

mod limiter;
mod limiters;
mod memory;
mod settings;

pub use limiter::{FailurePolicy, RateLimiter};
pub use limiters::Limiters;
pub use memory::{DEFAULT_SWEEP_INTERVAL, LocalCounterStore};
pub use settings::{RateLimitSettings, RedisConfig};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::RedisCounterStore;

use std::sync::Arc;
use std::time::Duration;

use gatekeep_core::domain::{Clock, LimiterKind, RateLimitPolicy};
use gatekeep_core::ports::{CounterStore, RateLimitError, StoreBackend};

/// Builds counter stores for the backend chosen once at startup.
///
/// There is no hot swap: whichever backend the settings select is used for
/// every limiter for the life of the process.
pub struct StoreFactory {
    backend: Backend,
    clock: Arc<dyn Clock>,
}

enum Backend {
    Local {
        sweep_interval: Duration,
    },
    #[cfg(feature = "redis")]
    Redis {
        conn: ::redis::aio::ConnectionManager,
        key_prefix: String,
    },
}

impl StoreFactory {
    /// Resolve the backend from `settings`.
    ///
    /// Redis settings that are present but unusable are an error; there is
    /// deliberately no fallback to the local store in that case.
    pub async fn connect(
        settings: &RateLimitSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RateLimitError> {
        let backend = match &settings.redis {
            None => {
                tracing::warn!(
                    "No Redis configured for rate limiting. Using in-memory counters; \
                     limits are not shared across processes."
                );
                Backend::Local {
                    sweep_interval: settings.sweep_interval,
                }
            }
            #[cfg(feature = "redis")]
            Some(config) => {
                let conn = self::redis::connect(config).await?;
                tracing::info!(
                    key_prefix = %settings.key_prefix,
                    "Connected to Redis rate limiter"
                );
                Backend::Redis {
                    conn,
                    key_prefix: settings.key_prefix.clone(),
                }
            }
            #[cfg(not(feature = "redis"))]
            Some(_) => {
                return Err(RateLimitError::Configuration(
                    "Redis is configured but this build lacks the `redis` feature".to_string(),
                ));
            }
        };

        Ok(Self { backend, clock })
    }

    /// A factory that always builds local stores.
    pub fn local(clock: Arc<dyn Clock>, sweep_interval: Duration) -> Self {
        Self {
            backend: Backend::Local { sweep_interval },
            clock,
        }
    }

    pub fn backend(&self) -> StoreBackend {
        match self.backend {
            Backend::Local { .. } => StoreBackend::Local,
            #[cfg(feature = "redis")]
            Backend::Redis { .. } => StoreBackend::Distributed,
        }
    }

    /// Build the store for one limiter. Local stores start their eviction
    /// sweep, so this must run inside a tokio runtime.
    pub fn build_store(&self, kind: LimiterKind, policy: RateLimitPolicy) -> Arc<dyn CounterStore> {
        match &self.backend {
            Backend::Local { sweep_interval } => {
                let store = Arc::new(LocalCounterStore::new(policy, self.clock.clone()));
                store.start_sweeper(*sweep_interval);
                store
            }
            #[cfg(feature = "redis")]
            Backend::Redis { conn, key_prefix } => Arc::new(RedisCounterStore::new(
                conn.clone(),
                format!("{}:{}", key_prefix, kind),
                policy,
                self.clock.clone(),
            )),
        }
    }

    pub fn build_limiter(&self, kind: LimiterKind, policy: RateLimitPolicy) -> RateLimiter {
        RateLimiter::new(kind, policy, self.build_store(kind, policy))
            .with_clock(self.clock.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeep_core::domain::SystemClock;

    #[tokio::test]
    async fn test_no_redis_selects_local() {
        let factory = StoreFactory::connect(&RateLimitSettings::default(), Arc::new(SystemClock))
            .await
            .unwrap();
        assert_eq!(factory.backend(), StoreBackend::Local);

        let store = factory.build_store(LimiterKind::Auth, RateLimitPolicy::authentication());
        assert_eq!(store.backend(), StoreBackend::Local);
        store.shutdown();
    }

    #[tokio::test]
    async fn test_malformed_redis_url_is_fatal() {
        let settings = RateLimitSettings {
            redis: Some(RedisConfig {
                url: "not a redis url".to_string(),
                token: None,
                connect_timeout: Duration::from_secs(1),
            }),
            ..RateLimitSettings::default()
        };

        let result = StoreFactory::connect(&settings, Arc::new(SystemClock)).await;
        assert!(matches!(result, Err(RateLimitError::Configuration(_))));
    }
}
