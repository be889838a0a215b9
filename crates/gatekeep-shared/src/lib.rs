//! # Gatekeep Shared
//!
//! Wire types shared between the limiter service and its HTTP clients.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;
