//! Read-side views over the store: per-source status and clear-all.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use mw_config::secrets::Secrets;
use mw_snapshot::{SnapshotStore, StoreError};
use mw_sources::{is_configured, SourceRegistry};
use serde::Serialize;
use tracing::info;

use crate::{CycleState, Orchestrator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SourceStatus {
    Monitored {
        name: String,
        configured: bool,
        count: usize,
        last_update: DateTime<Utc>,
        success: bool,
    },
    NotMonitored {
        name: String,
        configured: bool,
        /// Always `"not_monitored"`.
        status: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub timestamp: DateTime<Utc>,
    pub cycle: CycleState,
    pub providers: BTreeMap<String, SourceStatus>,
}

/// Configured flag plus last persisted snapshot metadata for every source.
pub async fn status_report(
    registry: &SourceRegistry,
    secrets: &Secrets,
    store: &dyn SnapshotStore,
) -> Result<BTreeMap<String, SourceStatus>, StoreError> {
    let mut providers = BTreeMap::new();
    for source in registry.iter() {
        let configured = is_configured(source, secrets);
        let entry = match store.get(&source.id).await? {
            Some(snap) => SourceStatus::Monitored {
                name: source.display_name.clone(),
                configured,
                count: snap.count,
                last_update: snap.observed_at,
                success: snap.success,
            },
            None => SourceStatus::NotMonitored {
                name: source.display_name.clone(),
                configured,
                status: "not_monitored",
            },
        };
        providers.insert(source.id.clone(), entry);
    }
    Ok(providers)
}

/// Delete every persisted snapshot: registry sources plus any stale keys left
/// by sources no longer registered. Returns the number of snapshots removed.
pub async fn clear_all(registry: &SourceRegistry, store: &dyn SnapshotStore) -> Result<usize, StoreError> {
    let mut ids: BTreeSet<String> = registry.iter().map(|s| s.id.clone()).collect();
    ids.extend(store.source_ids().await?);

    let mut removed = 0;
    for id in &ids {
        if store.delete(id).await? {
            removed += 1;
        }
    }
    info!(removed, "snapshots cleared");
    Ok(removed)
}

impl Orchestrator {
    pub async fn status(&self) -> Result<StatusReport, StoreError> {
        let providers = status_report(self.registry(), self.secrets(), self.store()).await?;
        Ok(StatusReport {
            timestamp: Utc::now(),
            cycle: self.state().await,
            providers,
        })
    }

    pub async fn clear_all(&self) -> Result<usize, StoreError> {
        clear_all(self.registry(), self.store()).await
    }
}
