//! Typed error taxonomy for database operations.

use thiserror::Error;

use crate::storage::StoreError;

/// Errors surfaced by [`Database`](crate::Database) operations.
///
/// Every write-path error aborts the local transaction. A failure after
/// the local commit (leader loss, lost compare-and-swap) leaves the
/// partition handle with a stale ETag; the next acquire detects the
/// drift and re-downloads.
#[derive(Debug, Error)]
pub enum DbError {
    /// This process lost the singleton election; writes must stop.
    #[error("leader changed: leader.uuid={leader_uuid}, local.uuid={local_uuid}")]
    LeaderChanged {
        /// Identity currently recorded in the leader object.
        leader_uuid: String,
        /// Identity of this process.
        local_uuid: String,
    },

    /// A partition file carries a schema version this build cannot serve.
    #[error("unsupported partition schema version {found:?}, expected \"1\"")]
    UnsupportedVersion {
        /// The version string found in the file.
        found: String,
    },

    /// The caller-supplied mutator rejected the write.
    #[error("mutator failed: {0}")]
    Mutator(#[source] anyhow::Error),

    /// A stat counter did not decode as a decimal integer.
    #[error("stat counter {name} is not a decimal integer: {value:?}")]
    BadCounter {
        /// Counter name within the `system` table.
        name: &'static str,
        /// The undecodable stored value.
        value: String,
    },

    /// A stored expiration did not decode as Unix milliseconds.
    #[error("stored expiration is not a unix-millis integer: {value:?}")]
    BadExpiration {
        /// The undecodable stored value.
        value: String,
    },

    /// The leader record exists but is not decodable.
    #[error("malformed leader record: {0}")]
    MalformedLeader(#[source] serde_json::Error),

    /// Object-store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Local B-tree failure.
    #[error("partition tree: {0}")]
    Tree(#[from] redb::Error),

    /// Local filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DbError {
    /// Whether this error is the singleton fence rejecting a stale writer.
    #[must_use]
    pub fn is_leader_changed(&self) -> bool {
        matches!(self, Self::LeaderChanged { .. })
    }
}

impl From<redb::DatabaseError> for DbError {
    fn from(err: redb::DatabaseError) -> Self {
        Self::Tree(err.into())
    }
}

impl From<redb::TransactionError> for DbError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Tree(err.into())
    }
}

impl From<redb::TableError> for DbError {
    fn from(err: redb::TableError) -> Self {
        Self::Tree(err.into())
    }
}

impl From<redb::StorageError> for DbError {
    fn from(err: redb::StorageError) -> Self {
        Self::Tree(err.into())
    }
}

impl From<redb::CommitError> for DbError {
    fn from(err: redb::CommitError) -> Self {
        Self::Tree(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_changed_message_has_the_canonical_prefix() {
        let err = DbError::LeaderChanged {
            leader_uuid: "them".to_string(),
            local_uuid: "us".to_string(),
        };
        assert!(err.to_string().starts_with("leader changed"));
        assert!(err.to_string().contains("them"));
        assert!(err.to_string().contains("us"));
        assert!(err.is_leader_changed());
    }

    #[test]
    fn store_errors_pass_through_transparently() {
        let err = DbError::from(StoreError::Precondition {
            path: "partitions/3/data.db".to_string(),
        });
        assert_eq!(err.to_string(), "precondition failed reading partitions/3/data.db");
        assert!(!err.is_leader_changed());
    }
}
