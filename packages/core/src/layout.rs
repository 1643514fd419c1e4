//! Object-store path layout shared by every process on a bucket.
//!
//! All durable state lives under two prefixes: `system/` for singleton
//! records and `partitions/` for the B-tree files. Local cache files are
//! disposable; these paths are the source of truth.

use serde::{Deserialize, Serialize};

/// Path of the singleton leader record.
pub const LEADER_PATH: &str = "system/leader.json";

/// Path of a partition's durable B-tree file.
#[must_use]
pub fn partition_path(partition_id: u32) -> String {
    format!("partitions/{partition_id}/data.db")
}

/// On-wire leader record stored at [`LEADER_PATH`]. Last writer wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderRecord {
    /// Process identity of the current leader.
    pub uuid: String,
}
