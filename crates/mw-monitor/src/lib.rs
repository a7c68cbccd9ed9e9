//! mw-monitor
//!
//! Cycle orchestration: filter configured sources, run them in fixed-size
//! concurrent batches with a pause between batches, and reconcile each source
//! (fetch → diff → notify → persist).
//!
//! # Contract
//! - A source missing secrets is skipped and never reaches the fetcher.
//! - A fetch failure sends a failure notification and leaves the store untouched.
//! - A snapshot is written, and a change notification sent, only on a first
//!   observation or a genuine change. An unchanged poll is a no-op.
//! - A store error is fatal to that source only; siblings and later batches run.
//! - Outcomes come back in registry order regardless of completion order.
//! - Overlapping cycles (scheduler + manual trigger) are not coordinated.

mod outcome;
mod runtime;
mod status;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use mw_config::secrets::Secrets;
use mw_config::CycleConfig;
use mw_diff::{compare, ChangeSet};
use mw_fetch::{Fetcher, Sleeper, TokioSleeper};
use mw_notify::Notifier;
use mw_schemas::{FetchResult, FetchSuccess, Snapshot};
use mw_snapshot::{SnapshotStore, StoreError};
use mw_sources::{missing_secret_names, SourceDescriptor, SourceRegistry};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use outcome::{CycleReport, CycleSummary, SkippedSource, SourceOutcome};
pub use runtime::{runtime_secret_names, Runtime};
pub use status::{SourceStatus, StatusReport};

// ---------------------------------------------------------------------------
// Settings / state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSettings {
    /// Sources per concurrent batch; values below 1 are treated as 1.
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl CycleSettings {
    pub fn from_config(cfg: &CycleConfig) -> Self {
        Self {
            batch_size: cfg.batch_size,
            batch_delay: cfg.batch_delay(),
        }
    }
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self::from_config(&CycleConfig::default())
    }
}

/// `Idle → Running → Completed`, then `Running` again on the next cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Running {
        cycle_id: Uuid,
        started_at: DateTime<Utc>,
    },
    Completed {
        cycle_id: Uuid,
        finished_at: DateTime<Utc>,
        summary: CycleSummary,
    },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    registry: Arc<SourceRegistry>,
    secrets: Arc<Secrets>,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    sleeper: Arc<dyn Sleeper>,
    settings: CycleSettings,
    state: RwLock<CycleState>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        secrets: Arc<Secrets>,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            secrets,
            fetcher,
            store,
            notifier,
            sleeper: Arc::new(TokioSleeper),
            settings: CycleSettings::default(),
            state: RwLock::new(CycleState::Idle),
        }
    }

    pub fn with_settings(mut self, settings: CycleSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Timer used for inter-batch pacing.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    pub fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> CycleSettings {
        self.settings
    }

    pub async fn state(&self) -> CycleState {
        self.state.read().await.clone()
    }

    /// Run one full cycle to completion.
    pub async fn run(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        *self.state.write().await = CycleState::Running {
            cycle_id,
            started_at,
        };

        let mut configured: Vec<&SourceDescriptor> = Vec::new();
        let mut skipped = Vec::new();
        for source in self.registry.iter() {
            let missing = missing_secret_names(source, &self.secrets);
            if missing.is_empty() {
                configured.push(source);
            } else {
                debug!(cycle_id = %cycle_id, source = %source.id, missing = ?missing, "source not configured; skipping");
                skipped.push(SkippedSource {
                    source_id: source.id.clone(),
                    name: source.display_name.clone(),
                    missing: missing.into_iter().collect(),
                });
            }
        }

        let batch_size = self.settings.batch_size.max(1);
        let batches: Vec<&[&SourceDescriptor]> = configured.chunks(batch_size).collect();
        info!(
            cycle_id = %cycle_id,
            configured = configured.len(),
            skipped = skipped.len(),
            batches = batches.len(),
            "cycle started"
        );

        let mut outcomes = Vec::with_capacity(configured.len());
        for (i, batch) in batches.iter().enumerate() {
            // join_all yields results in input order.
            let results = join_all(batch.iter().map(|s| self.reconcile(cycle_id, s))).await;
            outcomes.extend(results);

            if i + 1 < batches.len() {
                self.sleeper.sleep(self.settings.batch_delay).await;
            }
        }

        let report = CycleReport {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            skipped,
        };
        let summary = report.summary();
        info!(
            cycle_id = %cycle_id,
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            changed = summary.changed,
            "cycle completed"
        );

        *self.state.write().await = CycleState::Completed {
            cycle_id,
            finished_at: report.finished_at,
            summary,
        };
        report
    }

    /// One source: fetch, then either report the failure or publish the delta.
    async fn reconcile(&self, cycle_id: Uuid, source: &SourceDescriptor) -> SourceOutcome {
        info!(cycle_id = %cycle_id, source = %source.id, "processing source");

        let fetched = match self.fetcher.fetch(source, &self.secrets).await {
            FetchResult::Success(ok) => ok,
            FetchResult::Failure(failure) => {
                warn!(cycle_id = %cycle_id, source = %source.id, error = %failure.message, "source fetch failed");
                self.notifier.notify_failure(source, &failure).await;
                return SourceOutcome::Failure {
                    source_id: source.id.clone(),
                    name: source.display_name.clone(),
                    error: failure.message,
                    timestamp: failure.observed_at,
                };
            }
        };

        match self.publish(source, &fetched).await {
            Ok((changes, published)) => SourceOutcome::Success {
                source_id: source.id.clone(),
                name: source.display_name.clone(),
                count: fetched.count(),
                changes,
                published,
                timestamp: fetched.observed_at,
            },
            Err(e) => {
                error!(cycle_id = %cycle_id, source = %source.id, error = %e, "snapshot store failed");
                SourceOutcome::Failure {
                    source_id: source.id.clone(),
                    name: source.display_name.clone(),
                    error: format!("store error: {e}"),
                    timestamp: Utc::now(),
                }
            }
        }
    }

    /// Diff against the stored snapshot; notify then persist when it matters.
    async fn publish(
        &self,
        source: &SourceDescriptor,
        fetched: &FetchSuccess,
    ) -> Result<(ChangeSet, bool), StoreError> {
        let prior = self.store.get(&source.id).await?;
        let changes = compare(prior.as_ref(), fetched);
        if !changes.requires_publish() {
            return Ok((changes, false));
        }

        let snapshot = Snapshot::from_success(fetched);
        self.notifier.notify_change(source, &changes, &snapshot).await;
        self.store.put(&source.id, &snapshot).await?;
        info!(
            source = %source.id,
            first = changes.is_first_observation,
            added = changes.added.len(),
            removed = changes.removed.len(),
            count = snapshot.count,
            "snapshot published"
        );
        Ok((changes, true))
    }
}
