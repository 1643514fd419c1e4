//! `s3kv` server — a partitioned, single-writer key/value store that keeps
//! its durable state in an S3-compatible bucket and serves from locally
//! cached `redb` files.
//!
//! Layering, leaves first:
//!
//! - [`storage`]: the object-store adapter (ETags, conditional reads,
//!   best-effort compare-and-swap)
//! - [`db`]: partition cache, leader fence, and the transactional write
//!   path
//! - [`commands`]: Redis-shaped typed commands over the get/set primitive

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod storage;

pub use commands::Server;
pub use config::{DatabaseConfig, ObjectStoreConfig};
pub use db::Database;
pub use error::DbError;
pub use storage::{MemoryObjectStore, ObjectStore, S3ObjectStore, StoreError};
