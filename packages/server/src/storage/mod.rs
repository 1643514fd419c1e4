//! Object-store adapter layer.
//!
//! Defines the [`ObjectStore`] contract the database core runs against,
//! plus two implementations:
//!
//! - [`S3ObjectStore`]: `aws-sdk-s3` against any S3-compatible endpoint
//! - [`MemoryObjectStore`]: in-process store for development and tests

pub mod memory;
pub mod object_store;
pub mod s3;

pub use memory::MemoryObjectStore;
pub use object_store::{ObjectBody, ObjectStore, StoreError};
pub use s3::S3ObjectStore;
