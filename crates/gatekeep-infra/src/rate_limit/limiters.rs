//! The two named limiters the service runs.

use std::sync::Arc;

use gatekeep_core::domain::{Clock, LimiterKind, LimiterStats, RateLimitDecision};
use gatekeep_core::ports::RateLimitError;

use super::{RateLimitSettings, RateLimiter, StoreFactory};

/// Authentication and registration limiters, built once at startup and
/// handed to request handlers.
///
/// The two have separate policies and separate counters: an identifier that
/// burns its login quota can still register, and vice versa.
#[derive(Clone)]
pub struct Limiters {
    auth: RateLimiter,
    registration: RateLimiter,
}

impl Limiters {
    pub fn new(auth: RateLimiter, registration: RateLimiter) -> Self {
        Self { auth, registration }
    }

    /// Build both limiters with their default policies on the backend the
    /// settings select.
    pub async fn from_settings(
        settings: &RateLimitSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RateLimitError> {
        let factory = StoreFactory::connect(settings, clock).await?;
        Ok(Self::from_factory(&factory))
    }

    pub fn from_factory(factory: &StoreFactory) -> Self {
        let build = |kind: LimiterKind| factory.build_limiter(kind, kind.policy());
        Self::new(build(LimiterKind::Auth), build(LimiterKind::Registration))
    }

    pub fn get(&self, kind: LimiterKind) -> &RateLimiter {
        match kind {
            LimiterKind::Auth => &self.auth,
            LimiterKind::Registration => &self.registration,
        }
    }

    pub async fn check_auth_rate_limit(
        &self,
        identifier: &str,
    ) -> Result<RateLimitDecision, RateLimitError> {
        self.auth.check(identifier).await
    }

    pub async fn reset_auth_rate_limit(&self, identifier: &str) -> Result<(), RateLimitError> {
        self.auth.reset(identifier).await
    }

    pub async fn check_registration_rate_limit(
        &self,
        identifier: &str,
    ) -> Result<RateLimitDecision, RateLimitError> {
        self.registration.check(identifier).await
    }

    pub async fn reset_registration_rate_limit(
        &self,
        identifier: &str,
    ) -> Result<(), RateLimitError> {
        self.registration.reset(identifier).await
    }

    pub async fn limiter_stats(&self, kind: LimiterKind) -> Result<LimiterStats, RateLimitError> {
        self.get(kind).stats().await
    }

    /// Stop background eviction on both limiters.
    pub fn shutdown(&self) {
        self.auth.shutdown();
        self.registration.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::TimeDelta;
    use gatekeep_core::domain::ManualClock;

    fn local_limiters() -> (Limiters, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let factory = StoreFactory::local(clock.clone(), Duration::from_secs(300));
        (Limiters::from_factory(&factory), clock)
    }

    #[tokio::test]
    async fn test_named_policies() {
        let (limiters, _clock) = local_limiters();
        assert_eq!(
            limiters.get(LimiterKind::Auth).policy().window(),
            TimeDelta::minutes(15)
        );
        assert_eq!(
            limiters.get(LimiterKind::Registration).policy().window(),
            TimeDelta::minutes(60)
        );
        limiters.shutdown();
    }

    #[tokio::test]
    async fn test_limiters_do_not_share_counters() {
        let (limiters, _clock) = local_limiters();
        let id = "203.0.113.7";

        for _ in 0..5 {
            assert!(limiters.check_auth_rate_limit(id).await.unwrap().allowed);
        }
        assert!(!limiters.check_auth_rate_limit(id).await.unwrap().allowed);

        let decision = limiters.check_registration_rate_limit(id).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);

        let auth_stats = limiters.limiter_stats(LimiterKind::Auth).await.unwrap();
        assert_eq!(auth_stats.currently_limited, 1);
        let registration_stats = limiters
            .limiter_stats(LimiterKind::Registration)
            .await
            .unwrap();
        assert_eq!(registration_stats.currently_limited, 0);
        assert_eq!(registration_stats.total_tracked, 1);

        limiters.shutdown();
    }

    #[tokio::test]
    async fn test_auth_window_is_tighter_than_registration() {
        let (limiters, clock) = local_limiters();
        let id = "198.51.100.1";

        for _ in 0..5 {
            limiters.check_auth_rate_limit(id).await.unwrap();
            limiters.check_registration_rate_limit(id).await.unwrap();
        }

        clock.advance(TimeDelta::minutes(16));
        assert!(limiters.check_auth_rate_limit(id).await.unwrap().allowed);
        assert!(
            !limiters
                .check_registration_rate_limit(id)
                .await
                .unwrap()
                .allowed
        );

        limiters.shutdown();
    }

    #[tokio::test]
    async fn test_reset_after_successful_login() {
        let (limiters, _clock) = local_limiters();
        let id = "192.0.2.10";

        for _ in 0..6 {
            limiters.check_auth_rate_limit(id).await.unwrap();
        }
        limiters.reset_auth_rate_limit(id).await.unwrap();
        limiters.reset_registration_rate_limit(id).await.unwrap();

        let decision = limiters.check_auth_rate_limit(id).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);

        limiters.shutdown();
    }
}
