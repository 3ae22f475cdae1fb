//! Request and response types for hhr-daemon HTTP endpoints.
//!
//! No business logic lives here. Hand aggregates and replay entries are
//! served in their own serde form from `hhr-schemas` / `hhr-replay`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Errors on read endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// GET /v1/hands
// ---------------------------------------------------------------------------

/// `page` is zero-based; `page_size` is clamped to the configured maximum.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListHandsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}
