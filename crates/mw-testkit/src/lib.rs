//! mw-testkit
//!
//! Test doubles for the orchestrator seams (fetcher, notifier, sleeper, store)
//! plus small builders for synthetic sources. Nothing here touches the network.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use mw_config::secrets::Secrets;
use mw_diff::ChangeSet;
use mw_fetch::{Fetcher, Sleeper};
use mw_notify::Notifier;
use mw_schemas::{FetchFailure, FetchResult, FetchSuccess, Resource, Snapshot};
use mw_snapshot::{MemorySnapshotStore, SnapshotStore, StoreError};
use mw_sources::{required_secret_names, SourceDescriptor, SourceRegistry};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Secret name a synthetic source requires: `openai` -> `OPENAI_KEY`.
pub fn secret_name_for(id: &str) -> String {
    format!("{}_KEY", id.to_ascii_uppercase().replace('-', "_"))
}

/// Source whose only header is `Authorization: Bearer {{<ID>_KEY}}`.
pub fn source(id: &str) -> SourceDescriptor {
    SourceDescriptor::new(id, format!("Provider {id}"), format!("http://{id}.invalid/v1/models"))
        .with_header("Authorization", format!("Bearer {{{{{}}}}}", secret_name_for(id)))
}

pub fn registry(ids: &[&str]) -> SourceRegistry {
    SourceRegistry::new(ids.iter().map(|id| source(id)).collect())
        .unwrap_or_else(|e| panic!("test registry invalid: {e}"))
}

/// A value for every secret the given sources require.
pub fn secrets_for(ids: &[&str]) -> Secrets {
    Secrets::from_pairs(
        ids.iter()
            .map(|id| (secret_name_for(id), format!("test-secret-{id}"))),
    )
}

/// Resources whose id and name are both the given string.
pub fn resources(ids: &[&str]) -> Vec<Resource> {
    ids.iter().map(|id| Resource::new(*id, *id)).collect()
}

// ---------------------------------------------------------------------------
// ScriptedFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Reply {
    Catalog(Vec<Resource>),
    Fail(String),
}

/// Replies from a per-source queue. The last reply repeats once the queue is
/// down to one entry; a source with no script fails with "no scripted reply".
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<BTreeMap<String, VecDeque<Reply>>>,
    delays: Mutex<BTreeMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, id: &str, reply: Reply) -> Self {
        self.push(id, reply);
        self
    }

    pub fn catalog(self, id: &str, ids: &[&str]) -> Self {
        self.reply(id, Reply::Catalog(resources(ids)))
    }

    pub fn fail(self, id: &str, message: &str) -> Self {
        self.reply(id, Reply::Fail(message.to_string()))
    }

    /// Hold the fetch for `delay` before replying (wall clock).
    pub fn delay(self, id: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(id.to_string(), delay);
        self
    }

    /// Queue another reply for a later cycle.
    pub fn push(&self, id: &str, reply: Reply) {
        self.scripts
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Source ids in fetch-start order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, id: &str) -> Option<Reply> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(id)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, source: &SourceDescriptor, _secrets: &Secrets) -> FetchResult {
        self.calls.lock().unwrap().push(source.id.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(&source.id).copied();
        match delay {
            Some(d) => tokio::time::sleep(d).await,
            // let siblings in the same batch start before this one finishes
            None => tokio::task::yield_now().await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.next_reply(&source.id) {
            Some(Reply::Catalog(resources)) => FetchResult::Success(FetchSuccess {
                source_id: source.id.clone(),
                resources,
                observed_at: Utc::now(),
            }),
            Some(Reply::Fail(message)) => FetchResult::Failure(FetchFailure {
                source_id: source.id.clone(),
                message,
                observed_at: Utc::now(),
            }),
            None => FetchResult::Failure(FetchFailure {
                source_id: source.id.clone(),
                message: "no scripted reply".to_string(),
                observed_at: Utc::now(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Change {
        source_id: String,
        changes: ChangeSet,
        count: usize,
    },
    Failure {
        source_id: String,
        message: String,
        /// Secret names the failure message would list.
        required: BTreeSet<String>,
    },
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    /// Simulated delivery latency, paid after the message is recorded.
    latency: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record immediately, then hold the caller for `latency` like a slow webhook.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    async fn deliver(&self) {
        if let Some(d) = self.latency {
            tokio::time::sleep(d).await;
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn changes_for(&self, id: &str) -> Vec<ChangeSet> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Change {
                    source_id, changes, ..
                } if source_id == id => Some(changes),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_change(&self, source: &SourceDescriptor, changes: &ChangeSet, current: &Snapshot) {
        self.sent.lock().unwrap().push(Sent::Change {
            source_id: source.id.clone(),
            changes: changes.clone(),
            count: current.count,
        });
        self.deliver().await;
    }

    async fn notify_failure(&self, source: &SourceDescriptor, failure: &FetchFailure) {
        self.sent.lock().unwrap().push(Sent::Failure {
            source_id: source.id.clone(),
            message: failure.message.clone(),
            required: required_secret_names(source),
        });
        self.deliver().await;
    }
}

// ---------------------------------------------------------------------------
// RecordingSleeper
// ---------------------------------------------------------------------------

/// Virtual clock: records requested waits and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

// ---------------------------------------------------------------------------
// FlakyStore
// ---------------------------------------------------------------------------

/// Memory store that reports itself unavailable for selected source ids.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemorySnapshotStore,
    broken: BTreeSet<String>,
}

impl FlakyStore {
    pub fn broken_for(ids: &[&str]) -> Self {
        Self {
            inner: MemorySnapshotStore::new(),
            broken: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn inner(&self) -> &MemorySnapshotStore {
        &self.inner
    }

    fn check(&self, id: &str) -> Result<(), StoreError> {
        if self.broken.contains(id) {
            Err(StoreError::Unavailable(format!("injected outage for {id}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl SnapshotStore for FlakyStore {
    async fn get(&self, source_id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.check(source_id)?;
        self.inner.get(source_id).await
    }

    async fn put(&self, source_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.check(source_id)?;
        self.inner.put(source_id, snapshot).await
    }

    async fn delete(&self, source_id: &str) -> Result<bool, StoreError> {
        self.check(source_id)?;
        self.inner.delete(source_id).await
    }

    async fn source_ids(&self) -> Result<Vec<String>, StoreError> {
        self.inner.source_ids().await
    }
}
