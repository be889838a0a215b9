use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::RateLimitPolicy;
use crate::error::RateLimitExceeded;

/// Outcome of a single `check` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// The configured `max_attempts`.
    pub limit: u32,
    /// Attempts left in the current window, 0 when denied.
    pub remaining: u32,
    /// When the window, or the backoff penalty, clears.
    pub reset_at: DateTime<Utc>,
    /// Only present when the attempt was denied.
    pub retry_after: Option<Duration>,
}

impl RateLimitDecision {
    pub fn allowed(limit: u32, remaining: u32, reset_at: DateTime<Utc>) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at,
            retry_after: None,
        }
    }

    pub fn denied(limit: u32, reset_at: DateTime<Utc>, retry_after: TimeDelta) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at,
            retry_after: Some(retry_after.to_std().unwrap_or_default()),
        }
    }

    /// Decision used when the store could not be reached and the caller chose
    /// to fail open.
    pub fn unmetered(policy: &RateLimitPolicy, now: DateTime<Utc>) -> Self {
        Self::allowed(
            policy.max_attempts(),
            policy.max_attempts(),
            now + policy.window(),
        )
    }

    /// `retry_after` rounded up to whole seconds, as sent in `Retry-After`.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|d| {
            if d.subsec_nanos() > 0 {
                d.as_secs() + 1
            } else {
                d.as_secs()
            }
        })
    }

    /// Convert a denial into an error for `?`-style control flow.
    pub fn into_result(self) -> Result<Self, RateLimitExceeded> {
        if self.allowed {
            return Ok(self);
        }
        Err(RateLimitExceeded {
            retry_after: self.retry_after.unwrap_or_default(),
            limit: self.limit,
        })
    }
}

/// Read-only snapshot of a limiter's tracked identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LimiterStats {
    pub total_tracked: usize,
    pub currently_limited: usize,
    /// False when the backend cannot enumerate its keys and the counts are zeroed.
    pub exact: bool,
}

impl LimiterStats {
    pub fn unavailable() -> Self {
        Self {
            total_tracked: 0,
            currently_limited: 0,
            exact: false,
        }
    }
}

/// The named limiters the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimiterKind {
    Auth,
    Registration,
}

impl LimiterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimiterKind::Auth => "auth",
            LimiterKind::Registration => "registration",
        }
    }

    /// Default policy for this limiter.
    pub fn policy(&self) -> RateLimitPolicy {
        match self {
            LimiterKind::Auth => RateLimitPolicy::authentication(),
            LimiterKind::Registration => RateLimitPolicy::registration(),
        }
    }
}

impl fmt::Display for LimiterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up() {
        let now = Utc::now();
        let decision = RateLimitDecision::denied(5, now, TimeDelta::milliseconds(1500));
        assert_eq!(decision.retry_after_secs(), Some(2));

        let decision = RateLimitDecision::denied(5, now, TimeDelta::seconds(900));
        assert_eq!(decision.retry_after_secs(), Some(900));
    }

    #[test]
    fn test_into_result() {
        let now = Utc::now();
        assert!(RateLimitDecision::allowed(5, 4, now).into_result().is_ok());

        let err = RateLimitDecision::denied(5, now, TimeDelta::seconds(60))
            .into_result()
            .unwrap_err();
        assert_eq!(err.limit, 5);
        assert_eq!(err.retry_after, Duration::from_secs(60));
    }

    #[test]
    fn test_limiter_kind_wire_names() {
        let kind: LimiterKind = serde_json::from_str("\"registration\"").unwrap();
        assert_eq!(kind, LimiterKind::Registration);
        assert_eq!(serde_json::to_string(&LimiterKind::Auth).unwrap(), "\"auth\"");
    }
}
