//! Connection and database configuration.

use std::path::PathBuf;

/// Object-store connection and namespacing options.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    /// Host:port of the S3-compatible endpoint, without a scheme.
    pub endpoint: String,
    /// Static access key id.
    pub access_key_id: String,
    /// Static secret access key.
    pub secret_access_key: String,
    /// Whether to speak https to the endpoint.
    pub use_ssl: bool,
    /// Bucket holding all durable state.
    pub bucket: String,
    /// Key prefix applied to every object path. Empty means none.
    pub path_prefix: String,
}

/// Database behavior options.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Fixed partition count for key routing. Must match across every
    /// process sharing a bucket; changing it reshards the keyspace
    /// silently.
    pub max_partitions: u32,
    /// Directory where partition files are materialized. Files are cache
    /// only and are never deleted by the database itself.
    pub local_data_dir: PathBuf,
    /// When true, claim leadership on startup and fence every write.
    /// When false, concurrent writers rely solely on compare-and-swap
    /// and the loser of a race silently drops its write.
    pub singleton: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_partitions: 1024,
            local_data_dir: PathBuf::from("data"),
            singleton: true,
        }
    }
}
