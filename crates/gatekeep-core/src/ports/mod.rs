//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod rate_limit;

pub use rate_limit::{CounterStore, RateLimitError, StoreBackend};
