//! Singleton leader fence stored as a well-known object.
//!
//! The election is last-writer-wins: claiming simply overwrites the
//! record. Correctness comes from every writer re-reading the record
//! immediately before an upload and refusing to proceed when it names
//! someone else.

use s3kv_core::layout::{LeaderRecord, LEADER_PATH};
use tracing::info;

use crate::error::DbError;
use crate::storage::ObjectStore;

/// Unconditionally records `uuid` as the current leader.
pub(crate) async fn claim(store: &dyn ObjectStore, uuid: &str) -> Result<(), DbError> {
    let record = LeaderRecord {
        uuid: uuid.to_string(),
    };
    let body = serde_json::to_vec(&record).map_err(DbError::MalformedLeader)?;
    store.put_object(LEADER_PATH, body.into()).await?;
    info!(uuid, "claimed leadership");
    Ok(())
}

/// Fails with [`DbError::LeaderChanged`] unless `uuid` is still the
/// recorded leader.
///
/// A missing record also fences: this process cannot prove it controls
/// the bucket, so it must not upload.
pub(crate) async fn verify(store: &dyn ObjectStore, uuid: &str) -> Result<(), DbError> {
    let raw = store.get_object(LEADER_PATH).await?;
    let leader_uuid = match raw {
        Some(bytes) => {
            let record: LeaderRecord =
                serde_json::from_slice(&bytes).map_err(DbError::MalformedLeader)?;
            record.uuid
        }
        None => String::new(),
    };
    if leader_uuid == uuid {
        Ok(())
    } else {
        Err(DbError::LeaderChanged {
            leader_uuid,
            local_uuid: uuid.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::MemoryObjectStore;

    use super::*;

    #[tokio::test]
    async fn claim_then_verify_round_trips() {
        let store = MemoryObjectStore::new();
        claim(&store, "proc-1").await.unwrap();
        verify(&store, "proc-1").await.unwrap();
    }

    #[tokio::test]
    async fn a_later_claim_fences_the_earlier_one() {
        let store = MemoryObjectStore::new();
        claim(&store, "proc-1").await.unwrap();
        claim(&store, "proc-2").await.unwrap();

        let err = verify(&store, "proc-1").await.unwrap_err();
        assert!(err.is_leader_changed());
        assert!(err.to_string().starts_with("leader changed"));
        verify(&store, "proc-2").await.unwrap();
    }

    #[tokio::test]
    async fn a_missing_record_fences() {
        let store = MemoryObjectStore::new();
        let err = verify(&store, "proc-1").await.unwrap_err();
        assert!(err.is_leader_changed());
    }

    #[tokio::test]
    async fn a_garbage_record_is_malformed_not_fenced() {
        let store = MemoryObjectStore::new();
        store
            .put_object(LEADER_PATH, bytes::Bytes::from_static(b"not json"))
            .await
            .unwrap();
        let err = verify(&store, "proc-1").await.unwrap_err();
        assert!(matches!(err, DbError::MalformedLeader(_)));
    }
}
