//! In-memory [`ObjectStore`] backed by [`DashMap`], for development and
//! tests.
//!
//! ETags are fresh UUIDs assigned on every upload. Conditional reads
//! mirror lazy server behavior: a superseded ETag is reported on the
//! first chunk of the body stream rather than when the stream is opened.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::object_store::{ObjectBody, ObjectStore, StoreError};

/// One stored object: its current generation tag and body.
#[derive(Debug, Clone)]
struct StoredObject {
    etag: String,
    body: Bytes,
}

/// Object store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_etag() -> String {
        Uuid::new_v4().to_string()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_etag(&self, path: &str) -> Result<String, StoreError> {
        Ok(self
            .objects
            .get(path)
            .map(|object| object.etag.clone())
            .unwrap_or_default())
    }

    async fn get(&self, path: &str, etag: &str) -> Result<ObjectBody, StoreError> {
        let current = self.objects.get(path).map(|object| object.clone());
        let chunk = match current {
            Some(object) if object.etag == etag => Ok(object.body),
            _ => Err(StoreError::Precondition {
                path: path.to_string(),
            }),
        };
        Ok(Box::pin(futures_util::stream::iter(std::iter::once(chunk))))
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        source: &Path,
        _len: u64,
        expected_etag: &str,
    ) -> Result<String, StoreError> {
        let body = Bytes::from(tokio::fs::read(source).await?);
        // The entry guard makes this check-then-put atomic, which is
        // strictly stronger than the S3 rendition of the same contract.
        match self.objects.entry(path.to_string()) {
            Entry::Occupied(mut occupied) => {
                let latest = occupied.get().etag.clone();
                if latest != expected_etag {
                    return Err(StoreError::EtagMismatch {
                        path: path.to_string(),
                        latest,
                        expected: expected_etag.to_string(),
                    });
                }
                let etag = Self::fresh_etag();
                occupied.insert(StoredObject {
                    etag: etag.clone(),
                    body,
                });
                Ok(etag)
            }
            Entry::Vacant(vacant) => {
                if !expected_etag.is_empty() {
                    return Err(StoreError::EtagMismatch {
                        path: path.to_string(),
                        latest: String::new(),
                        expected: expected_etag.to_string(),
                    });
                }
                let etag = Self::fresh_etag();
                vacant.insert(StoredObject {
                    etag: etag.clone(),
                    body,
                });
                Ok(etag)
            }
        }
    }

    async fn get_object(&self, path: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self.objects.get(path).map(|object| object.body.clone()))
    }

    async fn put_object(&self, path: &str, body: Bytes) -> Result<(), StoreError> {
        self.objects.insert(
            path.to_string(),
            StoredObject {
                etag: Self::fresh_etag(),
                body,
            },
        );
        Ok(())
    }
}
