//! Rate limiter facade over whichever counter store is active.

use std::sync::Arc;

use gatekeep_core::domain::{
    Clock, LimiterKind, LimiterStats, RateLimitDecision, RateLimitPolicy, SystemClock,
};
use gatekeep_core::ports::{CounterStore, RateLimitError, StoreBackend};

/// What to do when the counter store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Deny the attempt. The default: the limiter exists to stop abuse.
    #[default]
    Closed,
    /// Allow the attempt and log loudly.
    Open,
}

/// One named limiter: a policy bound to a counter store.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct RateLimiter {
    kind: LimiterKind,
    policy: RateLimitPolicy,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(kind: LimiterKind, policy: RateLimitPolicy, store: Arc<dyn CounterStore>) -> Self {
        Self {
            kind,
            policy,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Clock for decisions made without the store, such as failing open.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn kind(&self) -> LimiterKind {
        self.kind
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn backend(&self) -> StoreBackend {
        self.store.backend()
    }

    /// Register one attempt for `identifier`.
    ///
    /// Store failures come back as `Err` and are never folded into a denial.
    pub async fn check(&self, identifier: &str) -> Result<RateLimitDecision, RateLimitError> {
        let decision = self.store.check(identifier).await.inspect_err(|e| {
            tracing::error!(
                limiter = %self.kind,
                backend = %self.store.backend(),
                error = %e,
                "Rate limit check failed"
            );
        })?;

        if !decision.allowed {
            tracing::warn!(
                limiter = %self.kind,
                identifier = %identifier,
                retry_after_secs = decision.retry_after_secs().unwrap_or_default(),
                "Rate limit exceeded"
            );
        }

        Ok(decision)
    }

    /// `check`, resolving store failures with `policy`.
    ///
    /// Under `Closed` the store error is returned for the caller to deny with;
    /// under `Open` the attempt is allowed unmetered.
    pub async fn check_with_policy(
        &self,
        identifier: &str,
        policy: FailurePolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        match (self.check(identifier).await, policy) {
            (Err(e), FailurePolicy::Open) => {
                tracing::error!(
                    limiter = %self.kind,
                    error = %e,
                    "Counter store unavailable, failing open"
                );
                Ok(RateLimitDecision::unmetered(&self.policy, self.clock.now()))
            }
            (result, _) => result,
        }
    }

    /// Clear all penalty state for `identifier`, e.g. after a successful login.
    pub async fn reset(&self, identifier: &str) -> Result<(), RateLimitError> {
        self.store.reset(identifier).await?;
        tracing::debug!(limiter = %self.kind, identifier = %identifier, "Rate limit reset");
        Ok(())
    }

    pub async fn stats(&self) -> Result<LimiterStats, RateLimitError> {
        self.store.stats().await
    }

    /// Stop background work owned by the store.
    pub fn shutdown(&self) {
        self.store.shutdown();
    }
}
