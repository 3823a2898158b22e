use ferrex_model::{unix_now, ThumbnailState, ThumbnailStatus};

use crate::error::{Result, StorageError};
use crate::store::CatalogStore;

impl CatalogStore {
    /// Records the outcome of a thumbnail generation attempt for `path`.
    pub async fn mark_thumbnail(
        &self,
        path: &str,
        state: ThumbnailState,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        self.timed("thumbnail_status.mark", || {
            sqlx::query(
                "INSERT INTO thumbnail_status (path, state, attempted_at, artifact_path)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(path) DO UPDATE SET
                    state = excluded.state,
                    attempted_at = excluded.attempted_at,
                    artifact_path = excluded.artifact_path",
            )
            .bind(path)
            .bind(state.as_str())
            .bind(unix_now())
            .bind(artifact_path)
            .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    pub async fn get_thumbnail_status(&self, path: &str) -> Result<ThumbnailStatus> {
        use sqlx::Row;
        let row = self
            .timed("thumbnail_status.get", || {
                sqlx::query(
                    "SELECT path, state, attempted_at, artifact_path
                     FROM thumbnail_status WHERE path = ?",
                )
                .bind(path)
                .fetch_optional(&self.pool)
            })
            .await?
            .ok_or_else(|| StorageError::NotFound("no thumbnail status for path".to_string()))?;
        row_to_status(row)
    }

    /// Files that have never been attempted, or last failed, ordered by
    /// path. Feeds the thumbnail engine's sweep source (§4.4).
    pub async fn files_pending_thumbnail(&self, limit: u32) -> Result<Vec<ThumbnailStatus>> {
        use sqlx::Row;
        let rows = self
            .timed("thumbnail_status.pending", || {
                sqlx::query(
                    "SELECT f.path AS path, COALESCE(ts.state, 'missing') AS state,
                            ts.attempted_at AS attempted_at, ts.artifact_path AS artifact_path
                     FROM files f
                     LEFT JOIN thumbnail_status ts ON ts.path = f.path
                     WHERE f.kind IN ('image', 'video')
                       AND COALESCE(ts.state, 'missing') IN ('missing', 'failed')
                     ORDER BY f.path ASC
                     LIMIT ?",
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
            })
            .await?;
        rows.into_iter().map(row_to_status).collect()
    }
}

fn row_to_status(row: sqlx::sqlite::SqliteRow) -> Result<ThumbnailStatus> {
    use sqlx::Row;
    Ok(ThumbnailStatus {
        path: row.try_get("path")?,
        state: row
            .try_get::<String, _>("state")?
            .parse::<ThumbnailState>()
            .map_err(StorageError::Storage)?,
        attempted_at: row.try_get("attempted_at")?,
        artifact_path: row.try_get("artifact_path")?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ferrex_contracts::NullObserver;
    use ferrex_model::{FileAttrs, MediaKind};

    use super::*;

    async fn store() -> CatalogStore {
        let store = CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap();
        store
            .upsert(
                "a.jpg",
                FileAttrs {
                    name: "a.jpg".to_string(),
                    kind: MediaKind::Image,
                    size_bytes: 1,
                    modified_at: 1,
                },
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn files_pending_thumbnail_includes_never_attempted() {
        let store = store().await;
        let pending = store.files_pending_thumbnail(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].state, ThumbnailState::Missing);
    }

    #[tokio::test]
    async fn mark_generated_removes_from_pending() {
        let store = store().await;
        store
            .mark_thumbnail("a.jpg", ThumbnailState::Generated, Some("sha256-deadbeef"))
            .await
            .unwrap();
        let pending = store.files_pending_thumbnail(10).await.unwrap();
        assert!(pending.is_empty());

        let status = store.get_thumbnail_status("a.jpg").await.unwrap();
        assert_eq!(status.state, ThumbnailState::Generated);
        assert_eq!(status.artifact_path.as_deref(), Some("sha256-deadbeef"));
    }

    #[tokio::test]
    async fn failed_thumbnails_remain_pending_for_retry() {
        let store = store().await;
        store
            .mark_thumbnail("a.jpg", ThumbnailState::Failed, None)
            .await
            .unwrap();
        let pending = store.files_pending_thumbnail(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].state, ThumbnailState::Failed);
    }
}
