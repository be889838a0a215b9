//! Middleware modules.

pub mod client_identity;
pub mod error;
