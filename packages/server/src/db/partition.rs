//! Per-partition cache of locally materialized B-tree files.
//!
//! Each partition handle lives forever once observed: the map is
//! insert-only and handles are shared across tasks. The handle's
//! reader/writer lock is the only synchronization for the partition;
//! refreshing the local file, reading it, and uploading it all happen
//! under that lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use futures_util::TryStreamExt;
use s3kv_core::layout::partition_path;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

use crate::error::DbError;
use crate::storage::ObjectStore;

use super::tables;

/// A locally opened generation of one partition.
pub(crate) struct OpenTree {
    /// The embedded B-tree.
    pub tree: redb::Database,
    /// Local file backing `tree`; streamed to the object store on writes.
    pub path: PathBuf,
}

/// Lock-guarded state of one partition handle.
///
/// Created empty; the first acquire populates `open`. A failed upload
/// leaves `etag` stale on purpose, so the next acquire re-downloads.
#[derive(Default)]
pub(crate) struct PartitionState {
    /// ETag observed when `open` was materialized. Empty until then.
    pub etag: String,
    /// Currently open generation, if any.
    pub open: Option<Arc<OpenTree>>,
}

pub(crate) type PartitionHandle = Arc<RwLock<PartitionState>>;

/// Read access to a materialized partition.
///
/// Holding this keeps the local generation from being replaced while a
/// read transaction runs against it.
pub(crate) struct PartitionRead {
    /// The open tree; reads run against this generation.
    pub open: Arc<OpenTree>,
    _guard: OwnedRwLockReadGuard<PartitionState>,
}

/// Exclusive access to a materialized partition, held across the local
/// transaction and the remote upload.
pub(crate) struct PartitionWrite {
    /// The open tree; the write transaction runs against this generation.
    pub open: Arc<OpenTree>,
    /// Lock-guarded state, kept so the writer can record the new ETag.
    pub state: OwnedRwLockWriteGuard<PartitionState>,
}

/// Process-wide cache mapping partition ids to locally opened files.
pub(crate) struct PartitionCache {
    store: Arc<dyn ObjectStore>,
    local_data_dir: PathBuf,
    handles: DashMap<u32, PartitionHandle>,
}

impl PartitionCache {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, local_data_dir: PathBuf) -> Self {
        Self {
            store,
            local_data_dir,
            handles: DashMap::new(),
        }
    }

    /// Every handle currently known to this process, for stat aggregation.
    pub(crate) fn materialized(&self) -> Vec<PartitionHandle> {
        self.handles
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Drops a handle, simulating a process restart for this partition.
    #[cfg(test)]
    pub(crate) fn evict(&self, partition_id: u32) {
        self.handles.remove(&partition_id);
    }

    /// Looks up or inserts the handle for `partition_id`. Insertion is
    /// idempotent; racing callers observe the same handle instance.
    fn handle(&self, partition_id: u32) -> PartitionHandle {
        let entry = self.handles.entry(partition_id).or_default();
        Arc::clone(entry.value())
    }

    /// Acquires a partition for reading.
    ///
    /// Fast path: when the cached generation matches the latest remote
    /// ETag, only the reader lock is touched.
    pub(crate) async fn acquire_read(&self, partition_id: u32) -> Result<PartitionRead, DbError> {
        let handle = self.handle(partition_id);
        let latest = self.store.get_etag(&partition_path(partition_id)).await?;

        {
            let state = Arc::clone(&handle).read_owned().await;
            if state.etag == latest {
                if let Some(open) = &state.open {
                    let open = Arc::clone(open);
                    return Ok(PartitionRead {
                        open,
                        _guard: state,
                    });
                }
            }
        }

        let mut state = handle.write_owned().await;
        let open = self.refresh(partition_id, &mut state, &latest).await?;
        Ok(PartitionRead {
            open,
            _guard: state.downgrade(),
        })
    }

    /// Acquires a partition for writing. The returned guard must be held
    /// until the upload finishes (or is abandoned).
    pub(crate) async fn acquire_write(&self, partition_id: u32) -> Result<PartitionWrite, DbError> {
        let handle = self.handle(partition_id);
        let latest = self.store.get_etag(&partition_path(partition_id)).await?;
        let mut state = handle.write_owned().await;
        let open = self.refresh(partition_id, &mut state, &latest).await?;
        Ok(PartitionWrite { open, state })
    }

    /// Under the writer lock: re-checks staleness (another writer may
    /// have refreshed while we waited), then downloads and opens a fresh
    /// generation when needed.
    async fn refresh(
        &self,
        partition_id: u32,
        state: &mut PartitionState,
        latest_etag: &str,
    ) -> Result<Arc<OpenTree>, DbError> {
        if state.etag == latest_etag {
            if let Some(open) = &state.open {
                return Ok(Arc::clone(open));
            }
        }

        let local_path = self.fresh_local_path(partition_id);
        let mut file = create_private(&local_path).await?;
        if latest_etag.is_empty() {
            // Absent remote: the empty file becomes a fresh tree below;
            // migration creates the tables and the first successful
            // write creates the object.
            debug!(partition_id, "materializing empty partition");
        } else {
            self.download(partition_id, latest_etag, &mut file).await?;
        }
        file.sync_all().await?;
        drop(file);

        let tree = redb::Database::create(&local_path)?;
        tables::migrate(&tree)?;
        let open = Arc::new(OpenTree {
            tree,
            path: local_path,
        });
        state.open = Some(Arc::clone(&open));
        state.etag = latest_etag.to_string();
        Ok(open)
    }

    /// `<dir>/<id>-<nanos>.db`, unique across concurrent reopens. Stale
    /// files are left behind for an external janitor.
    fn fresh_local_path(&self, partition_id: u32) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        self.local_data_dir
            .join(format!("{partition_id}-{nanos}.db"))
    }

    /// Streams the remote generation into `dest`.
    async fn download(
        &self,
        partition_id: u32,
        etag: &str,
        dest: &mut tokio::fs::File,
    ) -> Result<(), DbError> {
        let remote = partition_path(partition_id);
        debug!(partition_id, etag, "fetching partition file");
        let mut body = self.store.get(&remote, etag).await?;
        while let Some(chunk) = body.try_next().await? {
            dest.write_all(&chunk).await?;
        }
        Ok(())
    }
}

/// Creates an empty file readable and writable by the owner only.
async fn create_private(path: &Path) -> Result<tokio::fs::File, std::io::Error> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}
