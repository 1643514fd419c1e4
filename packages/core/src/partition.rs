//! Partition routing for distributing keys across B-tree files.
//!
//! Every process sharing a bucket must agree on the mapping from key to
//! partition, so the hash is a fixed contract: CRC-32/IEEE of the raw key
//! bytes, reduced modulo the configured partition count. Changing the
//! partition count under an existing bucket reshards the keyspace
//! silently and is a configuration error.

/// Computes the partition that owns `key`.
///
/// `partition_count` is fixed at database construction and must match
/// across every process sharing a bucket.
///
/// # Examples
///
/// ```
/// use s3kv_core::partition::partition_of;
///
/// assert_eq!(partition_of(b"123456789", 1024), 0xCBF4_3926 % 1024);
/// ```
///
/// # Panics
///
/// Panics if `partition_count` is zero.
#[must_use]
pub fn partition_of(key: &[u8], partition_count: u32) -> u32 {
    assert!(partition_count > 0, "partition_count must be non-zero");
    crc32fast::hash(key) % partition_count
}
