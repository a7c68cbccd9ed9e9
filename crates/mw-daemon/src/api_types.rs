//! Response types for all mw-daemon HTTP endpoints.
//!
//! Serialize-only: the payloads embed orchestrator types. No business logic
//! lives here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mw_monitor::{CycleState, CycleSummary, SkippedSource, SourceOutcome, SourceStatus};
use serde::Serialize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" when the process answers at all.
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// /monitor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MonitorResponse {
    pub success: bool,
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub summary: CycleSummary,
    pub results: Vec<SourceOutcome>,
    pub skipped: Vec<SkippedSource>,
}

// ---------------------------------------------------------------------------
// /status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub cycle: CycleState,
    pub providers: BTreeMap<String, SourceStatus>,
}

// ---------------------------------------------------------------------------
// /clear
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: &'static str,
    pub removed: usize,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Errors (404 / 500)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}
