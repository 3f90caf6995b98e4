//! Disk-based snapshot store.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::{AuthRef, ClassItem, Snapshot};

use super::SnapshotStore;
use super::error::StorageError;

/// On-disk record, borrowed for writing.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordRef<'a> {
    snapshot: &'a [ClassItem],
    timestamp: DateTime<Utc>,
    auth_ref: Option<&'a AuthRef>,
}

/// On-disk record, owned for reading.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    snapshot: Vec<ClassItem>,
    timestamp: DateTime<Utc>,
    auth_ref: Option<AuthRef>,
}

/// Just the capture time of the stored record.
#[derive(Deserialize)]
struct RecordHeader {
    timestamp: DateTime<Utc>,
}

/// Snapshot store backed by a single JSON file.
///
/// Saves hold an advisory lock on a sibling `<name>.lock` file, so writers
/// in other processes sharing the path are serialized too. Under the lock
/// the stored timestamp is checked against the caller's expectation, then a
/// uniquely named temporary file is written, flushed and renamed over the
/// target. The target always holds a complete record.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store that keeps its record at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the record file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

fn io_error(action: &'static str, path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

fn stored_timestamp(path: &Path) -> Result<Option<DateTime<Utc>>, StorageError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error("read", path, e)),
    };
    let header: RecordHeader =
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(header.timestamp))
}

/// Blocking half of a save: lock, compare, write, rename.
fn replace_record(
    path: &Path,
    lock_path: &Path,
    json: &[u8],
    expected: Option<DateTime<Utc>>,
) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| io_error("create directory", dir, e))?;

    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .map_err(|e| io_error("open lock file", lock_path, e))?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _guard = lock
        .write()
        .map_err(|e| io_error("lock", lock_path, e))?;

    let found = stored_timestamp(path)?;
    if found != expected {
        return Err(StorageError::Conflict { expected, found });
    }

    // Dropping the temporary file on any error below removes it
    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| io_error("create temporary file in", dir, e))?;
    temp.write_all(json)
        .map_err(|e| io_error("write", temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| io_error("sync", temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| io_error("replace", path, e.error))?;
    Ok(())
}

impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<Arc<Snapshot>>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &self.path, e)),
        };

        let record: Record =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(Some(Arc::new(Snapshot::new(
            record.snapshot,
            record.timestamp,
            record.auth_ref,
        ))))
    }

    async fn save(
        &self,
        snapshot: Arc<Snapshot>,
        expected: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let record = RecordRef {
            snapshot: snapshot.classes(),
            timestamp: snapshot.taken_at(),
            auth_ref: snapshot.auth_ref(),
        };
        let json = serde_json::to_vec_pretty(&record).map_err(StorageError::Serialize)?;

        let path = self.path.clone();
        let lock_path = self.lock_path();
        let write = move || replace_record(&path, &lock_path, &json, expected);
        tokio::task::spawn_blocking(write)
            .await
            .map_err(|e| io_error("save", &self.path, std::io::Error::other(e)))??;

        debug!(
            path = %self.path.display(),
            classes = snapshot.len(),
            "saved snapshot"
        );
        Ok(())
    }
}
