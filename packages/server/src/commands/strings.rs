//! Opaque string commands.

use super::Server;

impl Server {
    /// Stores `value` under `key`, replacing any previous value, with an
    /// optional expiration in Unix milliseconds.
    ///
    /// # Errors
    ///
    /// Surfaces write-path failures (leader loss, lost upload race, I/O).
    pub async fn set(
        &self,
        key: &[u8],
        value: Vec<u8>,
        expires_at: Option<i64>,
    ) -> anyhow::Result<()> {
        self.db
            .set(key, move |_prev, _prev_exp| Ok((value, expires_at)))
            .await?;
        Ok(())
    }

    /// Fetches the value stored under `key`. Expired entries read as
    /// absent.
    ///
    /// # Errors
    ///
    /// Surfaces read-path failures.
    pub async fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.db.get(key).await?.value)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::commands::testing;

    #[tokio::test]
    async fn set_then_get_then_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let server = testing::server(&dir).await;

        let key = Uuid::new_v4().to_string();
        let val1 = Uuid::new_v4().to_string();
        let val2 = Uuid::new_v4().to_string();

        server
            .set(key.as_bytes(), val1.clone().into_bytes(), None)
            .await
            .unwrap();
        let got = server.get(key.as_bytes()).await.unwrap();
        assert_eq!(got.as_deref(), Some(val1.as_bytes()));

        server
            .set(key.as_bytes(), val2.clone().into_bytes(), None)
            .await
            .unwrap();
        let got = server.get(key.as_bytes()).await.unwrap();
        assert_eq!(got.as_deref(), Some(val2.as_bytes()));
    }

    #[tokio::test]
    async fn get_of_a_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let server = testing::server(&dir).await;
        assert_eq!(server.get(b"missing").await.unwrap(), None);
    }
}
