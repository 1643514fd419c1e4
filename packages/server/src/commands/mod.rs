//! Redis-shaped typed commands layered over the database primitive.
//!
//! Every command is a thin codec over [`Database::get`] and
//! [`Database::set`]; nothing here touches partitions, locks, or the
//! object store directly. Commands are grouped by type family the way
//! the wire protocol groups them:
//!
//! - [`strings`]: opaque byte values
//! - [`hashes`]: field maps stored as JSON documents
//! - [`info`]: aggregate statistics rendering

mod hashes;
mod info;
mod strings;

use std::sync::Arc;

use crate::db::Database;

/// Command façade over a shared [`Database`].
#[derive(Clone)]
pub struct Server {
    db: Arc<Database>,
}

impl Server {
    /// Wraps a database in the typed command layer.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The underlying database, for primitive access.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }
}
