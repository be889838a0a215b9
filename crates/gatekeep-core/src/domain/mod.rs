//! Domain types - policies, decisions, and time.

mod clock;
mod decision;
mod policy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{LimiterKind, LimiterStats, RateLimitDecision};
pub use policy::{Backoff, RateLimitPolicy};
