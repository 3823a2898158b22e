use ferrex_model::{unix_now, Favorite, MediaKind};

use crate::error::{Result, StorageError};
use crate::store::CatalogStore;

impl CatalogStore {
    /// Adds `path` to favorites. Idempotent: favoriting an already
    /// favorited path refreshes nothing and returns success.
    pub async fn add_favorite(&self, path: &str, name: &str, kind: MediaKind) -> Result<()> {
        self.timed("favorites.add", || {
            sqlx::query(
                "INSERT OR IGNORE INTO favorites (path, name, kind, added_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(path)
            .bind(name)
            .bind(kind.as_str())
            .bind(unix_now())
            .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    /// Removes `path` from favorites. A no-op if it was not favorited.
    pub async fn remove_favorite(&self, path: &str) -> Result<()> {
        self.timed("favorites.remove", || {
            sqlx::query("DELETE FROM favorites WHERE path = ?")
                .bind(path)
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    /// Adds every entry in `entries` as a favorite in one transaction.
    pub async fn add_favorites_bulk(&self, entries: &[(String, String, MediaKind)]) -> Result<()> {
        self.timed("favorites.add_bulk", || async {
            let mut tx = self.pool.begin().await?;
            let now = unix_now();
            for (path, name, kind) in entries {
                sqlx::query(
                    "INSERT OR IGNORE INTO favorites (path, name, kind, added_at)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(path)
                .bind(name)
                .bind(kind.as_str())
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn is_favorite(&self, path: &str) -> Result<bool> {
        use sqlx::Row;
        let row = self
            .timed("favorites.is_favorite", || {
                sqlx::query("SELECT COUNT(*) AS count FROM favorites WHERE path = ?")
                    .bind(path)
                    .fetch_one(&self.pool)
            })
            .await?;
        Ok(row.try_get::<i64, _>("count")? > 0)
    }

    /// Lists favorites ordered by most recently added first.
    pub async fn list_favorites(&self) -> Result<Vec<Favorite>> {
        use sqlx::Row;
        let rows = self
            .timed("favorites.list", || {
                sqlx::query(
                    "SELECT path, name, kind, added_at FROM favorites ORDER BY added_at DESC",
                )
                .fetch_all(&self.pool)
            })
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(Favorite {
                    path: row.try_get("path")?,
                    name: row.try_get("name")?,
                    kind: row
                        .try_get::<String, _>("kind")?
                        .parse::<MediaKind>()
                        .map_err(StorageError::Storage)?,
                    added_at: row.try_get("added_at")?,
                })
            })
            .collect()
    }

    pub async fn favorite_count(&self) -> Result<u64> {
        use sqlx::Row;
        let row = self
            .timed("favorites.count", || {
                sqlx::query("SELECT COUNT(*) AS count FROM favorites").fetch_one(&self.pool)
            })
            .await?;
        Ok(row.try_get::<i64, _>("count")? as u64)
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
    async fn add_favorite_is_idempotent() {
        let store = store().await;
        store
            .add_favorite("a.jpg", "a.jpg", MediaKind::Image)
            .await
            .unwrap();
        store
            .add_favorite("a.jpg", "a.jpg", MediaKind::Image)
            .await
            .unwrap();
        assert_eq!(store.favorite_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_favorite_never_added_is_noop() {
        let store = store().await;
        store.remove_favorite("missing.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn is_favorite_reflects_current_state() {
        let store = store().await;
        assert!(!store.is_favorite("a.jpg").await.unwrap());
        store
            .add_favorite("a.jpg", "a.jpg", MediaKind::Image)
            .await
            .unwrap();
        assert!(store.is_favorite("a.jpg").await.unwrap());
        store.remove_favorite("a.jpg").await.unwrap();
        assert!(!store.is_favorite("a.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn list_favorites_orders_most_recent_first() {
        let store = store().await;
        store
            .add_favorites_bulk(&[
                ("a.jpg".to_string(), "a.jpg".to_string(), MediaKind::Image),
                ("b.jpg".to_string(), "b.jpg".to_string(), MediaKind::Image),
            ])
            .await
            .unwrap();
        let favorites = store.list_favorites().await.unwrap();
        assert_eq!(favorites.len(), 2);
    }
}
