//! In-memory counter store - fixed windows with exponential backoff.
//!
//! This is the fallback when no Redis is configured.
//! Note: Counters are per-process, not shared across instances.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use gatekeep_core::domain::{Clock, LimiterStats, RateLimitDecision, RateLimitPolicy};
use gatekeep_core::ports::{CounterStore, RateLimitError, StoreBackend};

/// Default interval between eviction sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CounterEntry {
    count: u32,
    window_reset_at: DateTime<Utc>,
    /// Start of the current penalty episode; drives the backoff curve.
    first_attempt_at: DateTime<Utc>,
    penalty_until: Option<DateTime<Utc>>,
    /// Set when this window ends in a penalty: a new window opened before
    /// this instant continues the episode.
    episode_until: Option<DateTime<Utc>>,
}

impl CounterEntry {
    fn open(now: DateTime<Utc>, policy: &RateLimitPolicy) -> Self {
        Self {
            count: 1,
            window_reset_at: now + policy.window(),
            first_attempt_at: now,
            penalty_until: None,
            episode_until: None,
        }
    }

    /// Start a new window in place. The episode start is kept only while the
    /// last penalty is recent; otherwise this is the same as a fresh entry.
    fn roll_over(&mut self, now: DateTime<Utc>, policy: &RateLimitPolicy) {
        let first_attempt_at = if self.continues_episode(now) {
            self.first_attempt_at
        } else {
            now
        };
        *self = Self {
            first_attempt_at,
            ..Self::open(now, policy)
        };
    }

    fn continues_episode(&self, now: DateTime<Utc>) -> bool {
        self.episode_until.is_some_and(|until| until > now)
    }

    fn is_penalized(&self, now: DateTime<Utc>) -> bool {
        self.penalty_until.is_some_and(|until| until > now)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.window_reset_at <= now
    }

    /// Removing the entry must not change the next decision, so an entry that
    /// would still carry its episode into a new window is kept.
    fn is_evictable(&self, now: DateTime<Utc>) -> bool {
        self.is_expired(now) && !self.continues_episode(now)
    }

    fn record(&mut self, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateLimitDecision {
        let limit = policy.max_attempts();

        if let Some(until) = self.penalty_until.filter(|until| *until > now) {
            return RateLimitDecision::denied(limit, until, until - now);
        }

        if self.is_expired(now) {
            self.roll_over(now, policy);
            return RateLimitDecision::allowed(limit, limit - 1, self.window_reset_at);
        }

        if self.count < limit {
            self.count += 1;
            return RateLimitDecision::allowed(limit, limit - self.count, self.window_reset_at);
        }

        let backoff = policy.backoff().penalty(now - self.first_attempt_at);
        let retry_after = (self.window_reset_at - now).max(backoff);
        let until = now + retry_after;

        // The window stays open until the penalty clears. A new window opened
        // within one backoff cap after that continues the episode.
        self.penalty_until = Some(until);
        self.window_reset_at = until;
        self.episode_until = Some(until + policy.backoff().cap);

        RateLimitDecision::denied(limit, until, retry_after)
    }
}

/// Per-identifier fixed-window counter store.
///
/// Entries live in a sharded map; each check holds its shard's write lock for
/// the whole read-modify-write, so attempts on one identifier are linearized
/// while other identifiers only contend when they share a shard.
pub struct LocalCounterStore {
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, CounterEntry>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl LocalCounterStore {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            entries: DashMap::new(),
            sweeper: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Record an attempt and decide. Never awaits while holding the shard lock.
    pub fn record_attempt(&self, identifier: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let policy = &self.policy;

        match self.entries.entry(identifier.to_string()) {
            Entry::Vacant(vacant) => {
                let entry = vacant.insert(CounterEntry::open(now, policy));
                RateLimitDecision::allowed(
                    policy.max_attempts(),
                    policy.max_attempts() - 1,
                    entry.window_reset_at,
                )
            }
            Entry::Occupied(mut occupied) => occupied.get_mut().record(now, policy),
        }
    }

    pub fn remove(&self, identifier: &str) {
        self.entries.remove(identifier);
    }

    pub fn snapshot(&self) -> LimiterStats {
        let now = self.clock.now();
        let mut stats = LimiterStats {
            exact: true,
            ..LimiterStats::default()
        };

        for entry in self.entries.iter() {
            if entry.is_expired(now) {
                continue;
            }
            stats.total_tracked += 1;
            if entry.is_penalized(now) {
                stats.currently_limited += 1;
            }
        }

        stats
    }

    /// Drop every entry whose window, penalty and episode have all passed.
    /// Returns how many entries were removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;

        self.entries.retain(|_, entry| {
            let keep = !entry.is_evictable(now);
            if !keep {
                evicted += 1;
            }
            keep
        });

        evicted
    }

    /// Spawn the periodic eviction sweep on the current tokio runtime.
    ///
    /// The task holds only a weak reference, so it ends on its own once the
    /// store is dropped. Calling this again replaces the running sweep.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };

                let evicted = store.evict_expired();
                if evicted > 0 {
                    tracing::debug!(
                        evicted,
                        remaining = store.entries.len(),
                        "Evicted expired rate limit entries"
                    );
                }
            }
        });

        if let Some(previous) = self.sweeper.lock().replace(handle) {
            previous.abort();
        }

        tracing::debug!(interval_secs = interval.as_secs(), "Rate limit eviction sweep started");
    }

    /// Halt the eviction sweep. Safe to call when no sweep is running.
    pub fn stop_sweeper(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
            tracing::debug!("Rate limit eviction sweep stopped");
        }
    }
}

impl Drop for LocalCounterStore {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl CounterStore for LocalCounterStore {
    async fn check(&self, identifier: &str) -> Result<RateLimitDecision, RateLimitError> {
        Ok(self.record_attempt(identifier))
    }

    async fn reset(&self, identifier: &str) -> Result<(), RateLimitError> {
        self.remove(identifier);
        Ok(())
    }

    async fn stats(&self) -> Result<LimiterStats, RateLimitError> {
        Ok(self.snapshot())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Local
    }

    fn shutdown(&self) {
        self.stop_sweeper();
    }
}
