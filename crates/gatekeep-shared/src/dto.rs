//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a check or reset call.
///
/// When `identifier` is omitted the service derives one from the proxy
/// headers of the request itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentifierRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

/// An allowed rate limit decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Snapshot of a limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub limiter: String,
    pub backend: String,
    pub total_tracked: usize,
    pub currently_limited: usize,
    /// False when the backend cannot enumerate its keys.
    pub exact: bool,
}
