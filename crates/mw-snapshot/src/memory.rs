//! In-process store for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use mw_schemas::Snapshot;

use crate::{check_put, check_source_id, SnapshotStore, StoreError};

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<BTreeMap<String, Snapshot>>,
    writes: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful `put` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Snapshot>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, source_id: &str) -> Result<Option<Snapshot>, StoreError> {
        check_source_id(source_id)?;
        Ok(self.lock()?.get(source_id).cloned())
    }

    async fn put(&self, source_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        check_put(source_id, snapshot)?;
        self.lock()?
            .insert(source_id.to_string(), snapshot.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, source_id: &str) -> Result<bool, StoreError> {
        check_source_id(source_id)?;
        Ok(self.lock()?.remove(source_id).is_some())
    }

    async fn source_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
