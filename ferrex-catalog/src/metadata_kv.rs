use ferrex_model::unix_now;

use crate::error::Result;
use crate::store::CatalogStore;

impl CatalogStore {
    /// Reads a single opaque metadata value (library-wide generation
    /// counters, last full-scan timestamp, and similar bookkeeping the
    /// core keeps alongside the catalog).
    pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        use sqlx::Row;
        let row = self
            .timed("metadata_kv.get", || {
                sqlx::query("SELECT value FROM metadata_kv WHERE key = ?")
                    .bind(key)
                    .fetch_optional(&self.pool)
            })
            .await?;
        row.map(|r| r.try_get("value")).transpose().map_err(Into::into)
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.timed("metadata_kv.set", || {
            sqlx::query(
                "INSERT INTO metadata_kv (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .bind(unix_now())
            .execute(&self.pool)
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ferrex_contracts::NullObserver;

    use super::*;

    async fn store() -> CatalogStore {
        CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn get_meta_missing_key_is_none() {
        let store = store().await;
        assert_eq!(store.get_meta("generation").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_meta_round_trips_and_overwrites() {
        let store = store().await;
        store.set_meta("generation", "1").await.unwrap();
        assert_eq!(store.get_meta("generation").await.unwrap().as_deref(), Some("1"));
        store.set_meta("generation", "2").await.unwrap();
        assert_eq!(store.get_meta("generation").await.unwrap().as_deref(), Some("2"));
    }
}
