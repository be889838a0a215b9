//! # Gatekeep Core
//!
//! The domain layer of the Gatekeep rate limiter.
//! This crate holds the limiter's pure logic and port definitions with zero
//! infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod identity;
pub mod ports;

pub use error::RateLimitExceeded;
pub use identity::client_identifier;
