//! Shared contracts for `s3kv`, the S3-backed partitioned key/value store.
//!
//! This crate is pure and I/O-free. It carries the parts every process
//! sharing a bucket must agree on:
//!
//! - [`partition`]: CRC-32/IEEE key routing
//! - [`layout`]: object-store paths and the leader record
//! - [`schema`]: partition-file table names, counter names, and their codec
//! - [`types`]: read and stat-aggregation results
//! - [`time`]: wall-clock helpers and the lazy-expiry rule

pub mod layout;
pub mod partition;
pub mod schema;
pub mod time;
pub mod types;

pub use layout::LeaderRecord;
pub use partition::partition_of;
pub use types::{DbInfo, Lookup};
