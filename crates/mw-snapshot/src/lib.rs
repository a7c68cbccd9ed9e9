//! mw-snapshot
//!
//! Durable per-source snapshot store.
//!
//! # Contract
//! - One value per source, addressed by `models_<source_id>`.
//! - Only successful snapshots are accepted by `put`; a failed poll must never
//!   overwrite the last good state.
//! - Different sources touch disjoint keys. There is no cross-key locking and no
//!   version check on the same key.

mod file;
mod memory;

use std::path::PathBuf;

use mw_schemas::Snapshot;
use thiserror::Error;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

pub const KEY_PREFIX: &str = "models_";

/// Store key for a source id.
pub fn snapshot_key(source_id: &str) -> String {
    format!("{KEY_PREFIX}{source_id}")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid snapshot key '{0}'")]
    InvalidKey(String),
    #[error("refusing to persist failure snapshot for '{0}'")]
    FailureSnapshot(String),
    #[error("snapshot for '{snapshot}' cannot be stored under '{key}'")]
    KeyMismatch { key: String, snapshot: String },
    #[error("snapshot io failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Last persisted snapshot, if any.
    async fn get(&self, source_id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the snapshot for `source_id`.
    async fn put(&self, source_id: &str, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Returns whether something was deleted.
    async fn delete(&self, source_id: &str) -> Result<bool, StoreError>;

    /// Source ids with a persisted snapshot, sorted.
    async fn source_ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Shared `put` preconditions for every backend.
pub(crate) fn check_put(source_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
    check_source_id(source_id)?;
    if !snapshot.success {
        return Err(StoreError::FailureSnapshot(source_id.to_string()));
    }
    if snapshot.source_id != source_id {
        return Err(StoreError::KeyMismatch {
            key: snapshot_key(source_id),
            snapshot: snapshot.source_id.clone(),
        });
    }
    Ok(())
}

/// Ids become file names; keep them to `[A-Za-z0-9_-]`.
pub(crate) fn check_source_id(source_id: &str) -> Result<(), StoreError> {
    let ok = !source_id.is_empty()
        && source_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(snapshot_key(source_id)))
    }
}
