//! Redis counter store using a sliding window counter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, IntoConnectionInfo, Script};

use gatekeep_core::domain::{Clock, LimiterStats, RateLimitDecision, RateLimitPolicy};
use gatekeep_core::ports::{CounterStore, RateLimitError, StoreBackend};

use super::settings::RedisConfig;

/// Sliding window over two fixed buckets: the previous bucket's count is
/// weighted by how much of it still overlaps the window ending now.
/// Returns: [allowed (0/1), attempts counted including this one if allowed]
const SLIDING_WINDOW_SCRIPT: &str = r#"
local current_key = KEYS[1]
local previous_key = KEYS[2]
local limit = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local window = tonumber(ARGV[3])

local current = tonumber(redis.call('GET', current_key) or '0')
local previous = tonumber(redis.call('GET', previous_key) or '0')
local weight = 1 - ((now % window) / window)
local used = math.floor(previous * weight) + current

if used >= limit then
    return {0, used}
end

local updated = redis.call('INCR', current_key)
if updated == 1 then
    redis.call('PEXPIRE', current_key, window * 2 + 1000)
end

return {1, used + 1}
"#;

/// Open a managed connection, failing at startup rather than later.
///
/// An unparsable URL is a configuration error; an unreachable server is a
/// store error.
pub async fn connect(config: &RedisConfig) -> Result<ConnectionManager, RateLimitError> {
    let mut info = config
        .url
        .as_str()
        .into_connection_info()
        .map_err(|e| RateLimitError::Configuration(format!("invalid Redis URL: {e}")))?;

    if let Some(token) = &config.token {
        info.redis.password = Some(token.clone());
    }

    let client = Client::open(info)
        .map_err(|e| RateLimitError::Configuration(format!("invalid Redis settings: {e}")))?;

    // Use timeout to prevent hanging if Redis is unreachable
    let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
        .await
        .map_err(|_| RateLimitError::StoreUnavailable("Connection timed out".to_string()))?
        .map_err(|e| RateLimitError::StoreUnavailable(e.to_string()))?;

    Ok(conn)
}

/// Redis-backed counter store shared by every process pointing at the same
/// server.
///
/// `ConnectionManager` is a cheap clonable handle that multiplexes one
/// connection and reconnects on its own; each call works on its own clone.
pub struct RedisCounterStore {
    conn: ConnectionManager,
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    /// `<prefix>:<limiter>` - keeps co-tenants and the two limiters apart.
    namespace: String,
    script: Script,
}

impl RedisCounterStore {
    pub fn new(
        conn: ConnectionManager,
        namespace: impl Into<String>,
        policy: RateLimitPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conn,
            policy,
            clock,
            namespace: namespace.into(),
            script: Script::new(SLIDING_WINDOW_SCRIPT),
        }
    }

    fn window_ms(&self) -> i64 {
        self.policy.window().num_milliseconds().max(1)
    }

    fn bucket_key(&self, identifier: &str, bucket: i64) -> String {
        format!("{}:{}:{}", self.namespace, identifier, bucket)
    }

    fn bucket_end(&self, bucket: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        DateTime::from_timestamp_millis((bucket + 1) * self.window_ms())
            .unwrap_or_else(|| now + self.policy.window())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn check(&self, identifier: &str) -> Result<RateLimitDecision, RateLimitError> {
        let now = self.clock.now();
        let now_ms = now.timestamp_millis();
        let window_ms = self.window_ms();
        let bucket = now_ms.div_euclid(window_ms);
        let limit = self.policy.max_attempts();
        let mut conn = self.conn.clone();

        let (allowed, used): (i64, i64) = self
            .script
            .key(self.bucket_key(identifier, bucket))
            .key(self.bucket_key(identifier, bucket - 1))
            .arg(limit)
            .arg(now_ms)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::StoreUnavailable(e.to_string()))?;

        let reset_at = self.bucket_end(bucket, now);

        if allowed == 1 {
            let remaining = u32::try_from(used)
                .map(|used| limit.saturating_sub(used))
                .unwrap_or(0);
            Ok(RateLimitDecision::allowed(limit, remaining, reset_at))
        } else {
            Ok(RateLimitDecision::denied(limit, reset_at, reset_at - now))
        }
    }

    async fn reset(&self, identifier: &str) -> Result<(), RateLimitError> {
        let bucket = self
            .clock
            .now()
            .timestamp_millis()
            .div_euclid(self.window_ms());
        let keys = [
            self.bucket_key(identifier, bucket),
            self.bucket_key(identifier, bucket - 1),
        ];
        let mut conn = self.conn.clone();

        // Best effort: the buckets expire on their own if this fails.
        conn.del::<_, ()>(&keys[..]).await.map_err(|e| {
            tracing::warn!(
                namespace = %self.namespace,
                error = %e,
                "Redis reset failed, counters will expire via TTL"
            );
            RateLimitError::StoreUnavailable(e.to_string())
        })
    }

    async fn stats(&self) -> Result<LimiterStats, RateLimitError> {
        // Enumerating keys on a shared server is not something to do per request.
        Ok(LimiterStats::unavailable())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Distributed
    }
}
