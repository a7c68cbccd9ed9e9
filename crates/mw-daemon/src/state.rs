//! Shared runtime state for mw-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The orchestrator owns
//! all cycle state; this module only adds build metadata and the scheduler.

use std::sync::Arc;
use std::time::Duration;

use mw_monitor::Orchestrator;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    /// Hash of the merged configuration the daemon was started with.
    pub config_hash: String,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, config_hash: impl Into<String>) -> Self {
        Self {
            build: BuildInfo {
                service: "mw-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config_hash: config_hash.into(),
            orchestrator,
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Spawn a background task that runs one cycle every `interval`.
///
/// The first cycle fires one full interval after start-up. A cycle that
/// overruns the interval delays the next tick instead of bursting.
/// Per-source failures are already contained inside the cycle report.
pub fn spawn_scheduled_cycles(orchestrator: Arc<Orchestrator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            info!("scheduled cycle triggered");
            let report = orchestrator.run().await;
            let summary = report.summary();
            info!(
                cycle_id = %report.cycle_id,
                successful = summary.successful,
                failed = summary.failed,
                changed = summary.changed,
                "scheduled cycle finished"
            );
        }
    })
}
