//! Contract between the database core and the object store.
//!
//! The store only has to offer S3-shaped primitives: ETags on read,
//! conditional GET, and plain PUT. Compare-and-swap is layered on top of
//! those and is therefore best-effort; the database pairs it with the
//! leader fence for correctness.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;

/// Streamed object body.
///
/// Chunks surface errors lazily, so a conditional read may fail on the
/// first chunk rather than when the stream is opened.
pub type ObjectBody = Pin<Box<dyn Stream<Item = Result<Bytes, StoreError>> + Send>>;

/// Errors surfaced by [`ObjectStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Compare-and-swap lost: the object moved past the expected ETag.
    #[error("etag mismatch at {path}: got {latest:?}, expected {expected:?}")]
    EtagMismatch {
        /// Object path the swap targeted.
        path: String,
        /// ETag observed on the server at swap time.
        latest: String,
        /// ETag the caller based its update on.
        expected: String,
    },

    /// A conditional read was rejected because its ETag is superseded.
    #[error("precondition failed reading {path}")]
    Precondition {
        /// Object path the read targeted.
        path: String,
    },

    /// Network or protocol failure talking to the store. Never retried here.
    #[error("object store transport failure at {path}: {source}")]
    Transport {
        /// Object path the operation targeted.
        path: String,
        /// Underlying client error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Local filesystem failure while staging a body.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this is an ETag precondition failure (conditional GET or
    /// CAS). Callers may retry by re-acquiring the partition.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::EtagMismatch { .. } | Self::Precondition { .. })
    }
}

/// S3-shaped object store with ETag-based optimistic concurrency.
///
/// Used as `Arc<dyn ObjectStore>`. Absent objects are reported as empty
/// ETags or `None` bodies, never as errors; only transport and
/// precondition failures surface as `Err`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Current ETag of `path`, or the empty string when absent.
    async fn get_etag(&self, path: &str) -> Result<String, StoreError>;

    /// Streams the body of `path`, guaranteed to match `etag`.
    ///
    /// A superseded `etag` surfaces [`StoreError::Precondition`] either
    /// from this call or from the first chunk of the returned stream,
    /// depending on when the server evaluates the precondition. Bodies
    /// are never buffered whole; callers stream them to a local file.
    async fn get(&self, path: &str, etag: &str) -> Result<ObjectBody, StoreError>;

    /// Best-effort compare-and-swap upload of a local file.
    ///
    /// Reads the current ETag; when it differs from `expected_etag` the
    /// call fails with [`StoreError::EtagMismatch`] carrying both values.
    /// Otherwise the `len` bytes at `source` are uploaded and the
    /// server-assigned ETag is returned. The check/upload window is not
    /// atomic: a concurrent winner is only caught once its own upload
    /// has finished. Callers pair this with an external fence.
    async fn compare_and_swap(
        &self,
        path: &str,
        source: &Path,
        len: u64,
        expected_etag: &str,
    ) -> Result<String, StoreError>;

    /// Unconditional small-object read. `None` when absent.
    async fn get_object(&self, path: &str) -> Result<Option<Bytes>, StoreError>;

    /// Unconditional small-object write.
    async fn put_object(&self, path: &str, body: Bytes) -> Result<(), StoreError>;
}
