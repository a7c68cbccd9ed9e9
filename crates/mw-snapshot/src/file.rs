//! Directory-backed store: one pretty JSON file per key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mw_schemas::Snapshot;
use tracing::debug;
use uuid::Uuid;

use crate::{check_put, check_source_id, snapshot_key, SnapshotStore, StoreError, KEY_PREFIX};

const EXT: &str = ".json";

#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// The directory is created lazily on the first `put`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, source_id: &str) -> PathBuf {
        self.dir.join(format!("{}{EXT}", snapshot_key(source_id)))
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait::async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn get(&self, source_id: &str) -> Result<Option<Snapshot>, StoreError> {
        check_source_id(source_id)?;
        let path = self.path_for(source_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path, e)),
        };
        let snap = serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
            key: snapshot_key(source_id),
            message: e.to_string(),
        })?;
        Ok(Some(snap))
    }

    async fn put(&self, source_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        check_put(source_id, snapshot)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_err(&self.dir, e))?;

        let json = serde_json::to_string_pretty(snapshot).map_err(|e| StoreError::Corrupt {
            key: snapshot_key(source_id),
            message: e.to_string(),
        })?;

        // Write-then-rename so a reader never sees a half-written file. Each
        // write gets its own tmp name; concurrent writers to one key race only
        // on the rename, and the last one wins.
        let path = self.path_for(source_id);
        let tmp = self
            .dir
            .join(format!(".{}{EXT}.{}.tmp", snapshot_key(source_id), Uuid::new_v4()));
        tokio::fs::write(&tmp, format!("{json}\n"))
            .await
            .map_err(|e| io_err(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_err(&path, e))?;

        debug!(source = %source_id, path = %path.display(), count = snapshot.count, "snapshot written");
        Ok(())
    }

    async fn delete(&self, source_id: &str) -> Result<bool, StoreError> {
        check_source_id(source_id)?;
        let path = self.path_for(source_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    async fn source_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut rd = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&self.dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = rd.next_entry().await.map_err(|e| io_err(&self.dir, e))? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name
                .strip_prefix(KEY_PREFIX)
                .and_then(|rest| rest.strip_suffix(EXT))
            {
                if check_source_id(id).is_ok() {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
