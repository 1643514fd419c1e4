//! Hash-map commands stored as versioned JSON documents.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::Server;

/// JSON envelope for one hash key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HashDocument {
    api_version: String,
    #[serde(default)]
    value: BTreeMap<String, String>,
}

impl HashDocument {
    fn empty() -> Self {
        Self {
            api_version: "v1".to_string(),
            value: BTreeMap::new(),
        }
    }

    /// Decodes a stored document; absent or empty values read as empty.
    fn decode(raw: Option<&[u8]>) -> anyhow::Result<Self> {
        match raw {
            Some(bytes) if !bytes.is_empty() => {
                serde_json::from_slice(bytes).context("hash document is not valid json")
            }
            _ => Ok(Self::empty()),
        }
    }
}

impl Server {
    /// Sets one field of the hash at `key`, preserving the previous
    /// expiration.
    ///
    /// # Errors
    ///
    /// Fails when the stored document does not decode, or on write-path
    /// failures.
    pub async fn hset(&self, key: &str, field: &str, value: &str) -> anyhow::Result<()> {
        let field = field.to_string();
        let value = value.to_string();
        self.db
            .set(key.as_bytes(), move |prev, prev_exp| {
                let mut doc = HashDocument::decode(prev)?;
                doc.value.insert(field, value);
                Ok((serde_json::to_vec(&doc)?, prev_exp))
            })
            .await?;
        Ok(())
    }

    /// Reads one field of the hash at `key`. Absent keys and fields read
    /// as `None`.
    ///
    /// # Errors
    ///
    /// Fails when the stored document does not decode.
    pub async fn hget(&self, key: &str, field: &str) -> anyhow::Result<Option<String>> {
        let mut all = self.hget_all(key).await?;
        Ok(all.remove(field))
    }

    /// Reads every field of the hash at `key`. Absent keys read as an
    /// empty map.
    ///
    /// # Errors
    ///
    /// Fails when the stored document does not decode.
    pub async fn hget_all(&self, key: &str) -> anyhow::Result<BTreeMap<String, String>> {
        let lookup = self.db.get(key.as_bytes()).await?;
        let doc = HashDocument::decode(lookup.value.as_deref())?;
        Ok(doc.value)
    }

    /// Adds `delta` to an integer field, returning the new total.
    /// Missing keys and fields start at zero.
    ///
    /// # Errors
    ///
    /// Fails when the field holds a non-integer value.
    pub async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> anyhow::Result<i64> {
        let field = field.to_string();
        let mut total = 0_i64;
        self.db
            .set(key.as_bytes(), |prev, prev_exp| {
                let mut doc = HashDocument::decode(prev)?;
                let current: i64 = match doc.value.get(&field) {
                    Some(raw) if !raw.is_empty() => raw
                        .parse()
                        .with_context(|| format!("hash field {field:?} is not an integer"))?,
                    _ => 0,
                };
                total = current + delta;
                doc.value.insert(field, total.to_string());
                Ok((serde_json::to_vec(&doc)?, prev_exp))
            })
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use uuid::Uuid;

    use crate::commands::testing;

    #[tokio::test]
    async fn hash_fields_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let server = testing::server(&dir).await;
        let key = Uuid::new_v4().to_string();

        // A missing hash reads as empty, not an error.
        assert!(server.hget_all(&key).await.unwrap().is_empty());
        assert_eq!(server.hget(&key, "a").await.unwrap(), None);

        server.hset(&key, "a", "A").await.unwrap();
        server.hset(&key, "b", "B").await.unwrap();

        assert_eq!(server.hget(&key, "a").await.unwrap().as_deref(), Some("A"));

        let mut expected = BTreeMap::new();
        expected.insert("a".to_string(), "A".to_string());
        expected.insert("b".to_string(), "B".to_string());
        assert_eq!(server.hget_all(&key).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn hset_overwrites_a_field() {
        let dir = tempfile::tempdir().unwrap();
        let server = testing::server(&dir).await;
        let key = Uuid::new_v4().to_string();

        server.hset(&key, "a", "first").await.unwrap();
        server.hset(&key, "a", "second").await.unwrap();
        assert_eq!(
            server.hget(&key, "a").await.unwrap().as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn hincr_by_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let server = testing::server(&dir).await;
        let key = Uuid::new_v4().to_string();

        let count = server.hincr_by(&key, "count", 10).await.unwrap();
        assert_eq!(count, 10);
        let count = server.hincr_by(&key, "count", 10).await.unwrap();
        assert_eq!(count, 20);
        let count = server.hincr_by(&key, "count", -5).await.unwrap();
        assert_eq!(count, 15);
    }

    #[tokio::test]
    async fn hincr_by_rejects_non_integer_fields() {
        let dir = tempfile::tempdir().unwrap();
        let server = testing::server(&dir).await;
        let key = Uuid::new_v4().to_string();

        server.hset(&key, "name", "alice").await.unwrap();
        assert!(server.hincr_by(&key, "name", 1).await.is_err());
        // The failed increment must not have clobbered the field.
        assert_eq!(
            server.hget(&key, "name").await.unwrap().as_deref(),
            Some("alice")
        );
    }
}
