//! Rate limiting port.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{LimiterStats, RateLimitDecision};

/// Counter store trait - abstraction over the local and distributed backends.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record one attempt for `identifier` and decide whether it is allowed.
    ///
    /// A denial is a normal `Ok` decision; `Err` means the store itself failed.
    async fn check(&self, identifier: &str) -> Result<RateLimitDecision, RateLimitError>;

    /// Clear all counter and penalty state for `identifier`.
    async fn reset(&self, identifier: &str) -> Result<(), RateLimitError>;

    /// Best-effort snapshot of tracked identifiers.
    async fn stats(&self) -> Result<LimiterStats, RateLimitError>;

    fn backend(&self) -> StoreBackend;

    /// Stop any background work owned by the store.
    fn shutdown(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Single-process memory, not shared across instances.
    Local,
    /// Shared external store.
    Distributed,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Local => f.write_str("local"),
            StoreBackend::Distributed => f.write_str("distributed"),
        }
    }
}

/// Rate limit errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    /// Store settings are present but unusable. Fatal at startup.
    #[error("Rate limiter misconfigured: {0}")]
    Configuration(String),

    /// The store could not be reached while serving a call.
    #[error("Counter store unavailable: {0}")]
    StoreUnavailable(String),
}
