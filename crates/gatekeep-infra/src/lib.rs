//! # Gatekeep Infrastructure
//!
//! Concrete implementations of the ports defined in `gatekeep-core`:
//! the in-memory and Redis counter stores, backend selection, and the
//! named limiters built on top of them.
//!
//! ## Feature Flags
//!
//! - `redis` (default) - Redis-backed distributed counter store

pub mod rate_limit;

// Re-exports
pub use rate_limit::{
    FailurePolicy, Limiters, LocalCounterStore, RateLimitSettings, RateLimiter, StoreFactory,
};

#[cfg(feature = "redis")]
pub use rate_limit::RedisCounterStore;
