//! `redb` table definitions, the migration routine, and counter helpers.

use redb::{ReadableTable, Table, TableDefinition};
use s3kv_core::schema::{
    decode_counter, encode_counter, EXPIRATION_TABLE, SCHEMA_VERSION, SYSTEM_TABLE, VALUE_TABLE,
    VERSION_KEY,
};

use crate::error::DbError;

/// Metadata and stat counters, decimal strings keyed by name.
pub(crate) const SYSTEM: TableDefinition<&str, &str> = TableDefinition::new(SYSTEM_TABLE);
/// Opaque key to opaque value.
pub(crate) const VALUES: TableDefinition<&[u8], &[u8]> = TableDefinition::new(VALUE_TABLE);
/// Opaque key to expiration instant, Unix milliseconds as a decimal string.
pub(crate) const EXPIRATIONS: TableDefinition<&[u8], &str> = TableDefinition::new(EXPIRATION_TABLE);

/// Ensures the three tables exist and the schema version is current.
///
/// Runs in its own write transaction every time a partition file is
/// opened locally. A fresh file gets `version = "1"`; a stored `"1"` is
/// accepted; anything else is fatal for this partition.
///
/// # Errors
///
/// [`DbError::UnsupportedVersion`] when the file was written by an
/// incompatible build.
pub(crate) fn migrate(tree: &redb::Database) -> Result<(), DbError> {
    let txn = tree.begin_write()?;
    {
        let mut system = txn.open_table(SYSTEM)?;
        txn.open_table(VALUES)?;
        txn.open_table(EXPIRATIONS)?;

        let version = system.get(VERSION_KEY)?.map(|guard| guard.value().to_string());
        match version.as_deref() {
            None => {
                system.insert(VERSION_KEY, SCHEMA_VERSION)?;
            }
            Some(found) if found == SCHEMA_VERSION => {}
            Some(found) => {
                return Err(DbError::UnsupportedVersion {
                    found: found.to_string(),
                });
            }
        }
    }
    txn.commit()?;
    Ok(())
}

/// Adds `delta` to a decimal-string counter, treating absent as zero.
pub(crate) fn bump_counter(
    system: &mut Table<'_, &'static str, &'static str>,
    name: &'static str,
    delta: i64,
) -> Result<(), DbError> {
    let current = match system.get(name)? {
        Some(guard) => {
            decode_counter(Some(guard.value())).map_err(|_| DbError::BadCounter {
                name,
                value: guard.value().to_string(),
            })?
        }
        None => 0,
    };
    system.insert(name, encode_counter(current + delta).as_str())?;
    Ok(())
}

/// Reads a counter from any readable system table. Absent reads as zero.
pub(crate) fn read_counter<T>(system: &T, name: &'static str) -> Result<i64, DbError>
where
    T: ReadableTable<&'static str, &'static str>,
{
    match system.get(name)? {
        Some(guard) => decode_counter(Some(guard.value())).map_err(|_| DbError::BadCounter {
            name,
            value: guard.value().to_string(),
        }),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use s3kv_core::schema::KEYS_COUNTER;

    use super::*;

    fn fresh_tree(dir: &tempfile::TempDir) -> redb::Database {
        redb::Database::create(dir.path().join("partition.db")).unwrap()
    }

    #[test]
    fn migrate_initializes_a_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let tree = fresh_tree(&dir);
        migrate(&tree).unwrap();

        let txn = tree.begin_read().unwrap();
        let system = txn.open_table(SYSTEM).unwrap();
        assert_eq!(system.get(VERSION_KEY).unwrap().unwrap().value(), "1");
        // The data tables exist and are empty.
        assert!(txn
            .open_table(VALUES)
            .unwrap()
            .get(b"missing".as_slice())
            .unwrap()
            .is_none());
        assert!(txn
            .open_table(EXPIRATIONS)
            .unwrap()
            .get(b"missing".as_slice())
            .unwrap()
            .is_none());
    }

    #[test]
    fn migrate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let tree = fresh_tree(&dir);
        migrate(&tree).unwrap();
        migrate(&tree).unwrap();

        let txn = tree.begin_read().unwrap();
        let system = txn.open_table(SYSTEM).unwrap();
        assert_eq!(system.get(VERSION_KEY).unwrap().unwrap().value(), "1");
    }

    #[test]
    fn migrate_rejects_an_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let tree = fresh_tree(&dir);
        {
            let txn = tree.begin_write().unwrap();
            {
                let mut system = txn.open_table(SYSTEM).unwrap();
                system.insert(VERSION_KEY, "2").unwrap();
            }
            txn.commit().unwrap();
        }

        let err = migrate(&tree).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedVersion { found } if found == "2"));
    }

    #[test]
    fn bump_counter_accumulates_signed_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let tree = fresh_tree(&dir);
        migrate(&tree).unwrap();

        let txn = tree.begin_write().unwrap();
        {
            let mut system = txn.open_table(SYSTEM).unwrap();
            bump_counter(&mut system, KEYS_COUNTER, 1).unwrap();
            bump_counter(&mut system, KEYS_COUNTER, 2).unwrap();
            bump_counter(&mut system, KEYS_COUNTER, -1).unwrap();
        }
        txn.commit().unwrap();

        let txn = tree.begin_read().unwrap();
        let system = txn.open_table(SYSTEM).unwrap();
        assert_eq!(read_counter(&system, KEYS_COUNTER).unwrap(), 2);
    }

    #[test]
    fn read_counter_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let tree = fresh_tree(&dir);
        migrate(&tree).unwrap();

        let txn = tree.begin_write().unwrap();
        {
            let mut system = txn.open_table(SYSTEM).unwrap();
            system.insert(KEYS_COUNTER, "garbage").unwrap();
        }
        txn.commit().unwrap();

        let txn = tree.begin_read().unwrap();
        let system = txn.open_table(SYSTEM).unwrap();
        let err = read_counter(&system, KEYS_COUNTER).unwrap_err();
        assert!(matches!(err, DbError::BadCounter { name: "keys", .. }));
    }
}
