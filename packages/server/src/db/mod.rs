//! The database core: key routing, partition caching, leader fencing,
//! and the transactional write path.
//!
//! Every write is a full cycle: acquire the partition (downloading if the
//! cached generation is stale), mutate the local B-tree in a transaction,
//! re-verify leadership, then publish the whole file with a
//! compare-and-swap against the last observed ETag.

mod leader;
mod partition;
mod tables;

use std::sync::Arc;

use redb::ReadableTable;
use s3kv_core::layout::partition_path;
use s3kv_core::partition::partition_of;
use s3kv_core::schema::{EXPIRES_COUNTER, KEYS_COUNTER, WRITES_COUNTER};
use s3kv_core::time::{is_elapsed, now_millis};
use s3kv_core::types::{DbInfo, Lookup};
use tracing::warn;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::DbError;
use crate::storage::ObjectStore;

use self::partition::PartitionCache;
use self::tables::{bump_counter, read_counter, EXPIRATIONS, SYSTEM, VALUES};

/// Partitioned key/value store persisting its state in an object store.
///
/// Each partition is one `redb` file cached locally and rewritten to the
/// bucket via compare-and-swap on every write. In singleton mode at most
/// one process (the leader) may write; reads are always served from the
/// local cache once it is current.
pub struct Database {
    uuid: String,
    store: Arc<dyn ObjectStore>,
    cache: PartitionCache,
    max_partitions: u32,
    singleton: bool,
}

impl Database {
    /// Opens a database over `store`, claiming leadership when configured
    /// as a singleton. The claim is last-writer-wins; an earlier process
    /// on the same bucket is fenced from its next write onward.
    ///
    /// # Errors
    ///
    /// Fails when the leadership claim cannot be written.
    pub async fn open(
        store: Arc<dyn ObjectStore>,
        config: DatabaseConfig,
    ) -> Result<Self, DbError> {
        let uuid = Uuid::new_v4().to_string();
        if config.singleton {
            leader::claim(store.as_ref(), &uuid).await?;
        }
        Ok(Self {
            uuid,
            cache: PartitionCache::new(Arc::clone(&store), config.local_data_dir),
            store,
            max_partitions: config.max_partitions,
            singleton: config.singleton,
        })
    }

    fn partition_id(&self, key: &[u8]) -> u32 {
        partition_of(key, self.max_partitions)
    }

    /// Reads `key`, suppressing values whose expiration has elapsed.
    ///
    /// The stored expiration is returned even when it is already in the
    /// past, so callers can observe lazily-expired entries. Never
    /// mutates: expired rows are left for the next write to overwrite.
    ///
    /// # Errors
    ///
    /// Surfaces object-store, filesystem, and local B-tree failures.
    pub async fn get(&self, key: &[u8]) -> Result<Lookup, DbError> {
        let acquired = self.cache.acquire_read(self.partition_id(key)).await?;

        let txn = acquired.open.tree.begin_read()?;
        let values = txn.open_table(VALUES)?;
        let expirations = txn.open_table(EXPIRATIONS)?;

        let mut value = values.get(key)?.map(|guard| guard.value().to_vec());
        let expires_at = match expirations.get(key)? {
            Some(guard) => Some(parse_expiration(guard.value())?),
            None => None,
        };
        if let Some(pxat) = expires_at {
            if is_elapsed(pxat, now_millis()) {
                value = None;
            }
        }
        Ok(Lookup { value, expires_at })
    }

    /// Applies `mutate` to `key` inside a local transaction, then
    /// publishes the partition with compare-and-swap.
    ///
    /// `mutate` sees the previous live value (`None` when the key never
    /// existed or its expiration has elapsed) and the previous raw
    /// expiration, and returns the new value plus an optional expiration
    /// in Unix milliseconds. It runs exactly once and is never retried.
    ///
    /// # Errors
    ///
    /// * [`DbError::Mutator`] when the callback rejects the write; the
    ///   transaction aborts and no counter moves.
    /// * [`DbError::LeaderChanged`] when this process lost the singleton
    ///   election; the upload is skipped. The local tree keeps the
    ///   committed mutation, but its stale ETag makes the next acquire
    ///   re-download the authoritative generation.
    /// * [`StoreError::EtagMismatch`](crate::storage::StoreError) via
    ///   [`DbError::Store`] when another writer won the upload race; the
    ///   next acquire heals the cache. No automatic retry.
    pub async fn set<F>(&self, key: &[u8], mutate: F) -> Result<(), DbError>
    where
        F: FnOnce(Option<&[u8]>, Option<i64>) -> anyhow::Result<(Vec<u8>, Option<i64>)> + Send,
    {
        let partition_id = self.partition_id(key);
        let mut acquired = self.cache.acquire_write(partition_id).await?;

        let txn = acquired.open.tree.begin_write()?;
        {
            let mut system = txn.open_table(SYSTEM)?;
            let mut values = txn.open_table(VALUES)?;
            let mut expirations = txn.open_table(EXPIRATIONS)?;

            let prev_value = values.get(key)?.map(|guard| guard.value().to_vec());
            let prev_pxat = match expirations.get(key)? {
                Some(guard) => Some(parse_expiration(guard.value())?),
                None => None,
            };

            // Lazy expiry: an elapsed expiration hides the value from the
            // mutator, but the raw timestamp is still passed through.
            let mut live_prev = prev_value.as_deref();
            if let Some(pxat) = prev_pxat {
                if is_elapsed(pxat, now_millis()) {
                    live_prev = None;
                }
            }
            let was_absent = live_prev.is_none();

            let (new_value, new_pxat) = mutate(live_prev, prev_pxat).map_err(DbError::Mutator)?;

            values.insert(key, new_value.as_slice())?;
            match new_pxat {
                Some(pxat) => {
                    expirations.insert(key, pxat.to_string().as_str())?;
                }
                None => {
                    expirations.remove(key)?;
                }
            }

            bump_counter(&mut system, WRITES_COUNTER, 1)?;
            if was_absent {
                // Covers both never-written and lazily-expired keys, so
                // `keys` is a high-water mark of first-time writes, not a
                // live count.
                bump_counter(&mut system, KEYS_COUNTER, 1)?;
                if new_pxat.is_some() {
                    bump_counter(&mut system, EXPIRES_COUNTER, 1)?;
                }
            } else {
                match (prev_pxat.is_some(), new_pxat.is_some()) {
                    (true, false) => bump_counter(&mut system, EXPIRES_COUNTER, -1)?,
                    (false, true) => bump_counter(&mut system, EXPIRES_COUNTER, 1)?,
                    _ => {}
                }
            }
        }
        txn.commit()?;

        // The committed file is the proposed new generation.
        let len = tokio::fs::metadata(&acquired.open.path).await?.len();

        if self.singleton {
            leader::verify(self.store.as_ref(), &self.uuid).await?;
        }

        let remote = partition_path(partition_id);
        match self
            .store
            .compare_and_swap(&remote, &acquired.open.path, len, &acquired.state.etag)
            .await
        {
            Ok(new_etag) => {
                acquired.state.etag = new_etag;
                Ok(())
            }
            Err(err) => {
                warn!(
                    partition_id,
                    error = %err,
                    "partition upload lost; cache heals on next acquire"
                );
                Err(err.into())
            }
        }
    }

    /// Sums stat counters across partitions materialized in this process.
    ///
    /// Partitions this process has never touched contribute zero, so the
    /// result is approximate after a cold start.
    ///
    /// # Errors
    ///
    /// Surfaces local B-tree failures and undecodable counters.
    pub async fn info(&self) -> Result<DbInfo, DbError> {
        let mut info = DbInfo::default();
        for handle in self.cache.materialized() {
            let state = handle.read().await;
            let Some(open) = &state.open else { continue };

            let txn = open.tree.begin_read()?;
            let system = txn.open_table(SYSTEM)?;
            info.keys += read_counter(&system, KEYS_COUNTER)?;
            info.expires += read_counter(&system, EXPIRES_COUNTER)?;
            info.total_write_commands_processed += read_counter(&system, WRITES_COUNTER)?;
        }
        Ok(info)
    }
}

fn parse_expiration(raw: &str) -> Result<i64, DbError> {
    raw.parse().map_err(|_| DbError::BadExpiration {
        value: raw.to_string(),
    })
}
