//! Rate limit policy - immutable limiter configuration.

use std::time::Duration;

use chrono::TimeDelta;

use crate::ports::RateLimitError;

/// Exponential backoff curve applied once quota is exceeded.
///
/// The penalty doubles every `step` of sustained abuse, starting at `base`
/// and never exceeding `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: TimeDelta,
    pub step: TimeDelta,
    pub cap: TimeDelta,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: TimeDelta::minutes(1),
            step: TimeDelta::minutes(5),
            cap: TimeDelta::hours(1),
        }
    }
}

impl Backoff {
    /// Penalty for an episode that started `elapsed` ago.
    pub fn penalty(&self, elapsed: TimeDelta) -> TimeDelta {
        let elapsed = elapsed.max(TimeDelta::zero());
        let step_ms = self.step.num_milliseconds().max(1);
        let intervals = elapsed.num_milliseconds() / step_ms;

        // 2^30 minutes is already centuries past any sane cap.
        if intervals >= 30 {
            return self.cap;
        }

        self.base
            .checked_mul(1_i32 << intervals)
            .map_or(self.cap, |penalty| penalty.min(self.cap))
    }
}

/// Attempts allowed per window plus the backoff curve.
///
/// Fixed for the lifetime of a limiter; there are no setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_attempts: u32,
    window: TimeDelta,
    backoff: Backoff,
}

impl RateLimitPolicy {
    pub fn new(max_attempts: u32, window: Duration) -> Result<Self, RateLimitError> {
        if max_attempts == 0 {
            return Err(RateLimitError::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let window = TimeDelta::from_std(window)
            .ok()
            .filter(|w| *w > TimeDelta::zero())
            .ok_or_else(|| {
                RateLimitError::Configuration("window must be a positive duration".to_string())
            })?;

        Ok(Self {
            max_attempts,
            window,
            backoff: Backoff::default(),
        })
    }

    /// Login attempts: 5 per 15 minutes.
    pub fn authentication() -> Self {
        Self {
            max_attempts: 5,
            window: TimeDelta::minutes(15),
            backoff: Backoff::default(),
        }
    }

    /// Account registrations: 5 per hour.
    pub fn registration() -> Self {
        Self {
            max_attempts: 5,
            window: TimeDelta::hours(1),
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}
