use ferrex_model::{normalize_tag_name, FileEntry, MediaKind, Tag, TagWithCount};

use crate::error::{Result, StorageError};
use crate::store::CatalogStore;

impl CatalogStore {
    /// Adds `tag` to `path`, creating the tag row if it does not already
    /// exist. Idempotent: re-adding an existing tag is a no-op success.
    pub async fn add_tag(&self, path: &str, tag: &str) -> Result<()> {
        let name = normalize_tag_name(tag);
        if name.is_empty() {
            return Err(StorageError::Validation("tag name is empty".to_string()));
        }
        self.timed("tags.add_tag", || async {
            let mut tx = self.pool.begin().await?;
            let tag_id = Self::ensure_tag_in_tx(&mut tx, &name).await?;
            sqlx::query(
                "INSERT OR IGNORE INTO file_tags (file_path, tag_id) VALUES (?, ?)",
            )
            .bind(path)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Removes `tag` from `path`. Removing a tag that was never applied
    /// is a no-op success.
    pub async fn remove_tag(&self, path: &str, tag: &str) -> Result<()> {
        let name = normalize_tag_name(tag);
        self.timed("tags.remove_tag", || {
            sqlx::query(
                "DELETE FROM file_tags
                 WHERE file_path = ? AND tag_id = (SELECT id FROM tags WHERE name = ?)",
            )
            .bind(path)
            .bind(&name)
            .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    /// Replaces the full tag set on `path` with exactly `tags`.
    pub async fn set_tags(&self, path: &str, tags: &[String]) -> Result<()> {
        self.timed("tags.set_tags", || async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("DELETE FROM file_tags WHERE file_path = ?")
                .bind(path)
                .execute(&mut *tx)
                .await?;
            for tag in tags {
                let name = normalize_tag_name(tag);
                if name.is_empty() {
                    continue;
                }
                let tag_id = Self::ensure_tag_in_tx(&mut tx, &name).await?;
                sqlx::query("INSERT OR IGNORE INTO file_tags (file_path, tag_id) VALUES (?, ?)")
                    .bind(path)
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Applies `add_names` and removes `remove_names` on every path in
    /// `paths`, in a single transaction. A name present in both lists is
    /// added: adds are applied after removes.
    pub async fn batch_apply_tags(
        &self,
        paths: &[String],
        add_names: &[String],
        remove_names: &[String],
    ) -> Result<()> {
        self.timed("tags.batch_apply_tags", || async {
            let mut tx = self.pool.begin().await?;

            let mut remove_ids = Vec::with_capacity(remove_names.len());
            for tag in remove_names {
                let name = normalize_tag_name(tag);
                if name.is_empty() {
                    continue;
                }
                use sqlx::Row;
                let id: Option<i64> = sqlx::query("SELECT id FROM tags WHERE name = ?")
                    .bind(&name)
                    .fetch_optional(&mut *tx)
                    .await?
                    .map(|row| row.try_get("id"))
                    .transpose()?;
                if let Some(id) = id {
                    remove_ids.push(id);
                }
            }
            for path in paths {
                for tag_id in &remove_ids {
                    sqlx::query("DELETE FROM file_tags WHERE file_path = ? AND tag_id = ?")
                        .bind(path)
                        .bind(tag_id)
                        .execute(&mut *tx)
                        .await?;
                }
            }

            let mut add_ids = Vec::with_capacity(add_names.len());
            for tag in add_names {
                let name = normalize_tag_name(tag);
                if name.is_empty() {
                    continue;
                }
                add_ids.push(Self::ensure_tag_in_tx(&mut tx, &name).await?);
            }
            for path in paths {
                for tag_id in &add_ids {
                    sqlx::query(
                        "INSERT OR IGNORE INTO file_tags (file_path, tag_id) VALUES (?, ?)",
                    )
                    .bind(path)
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn ensure_tag_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        name: &str,
    ) -> Result<i64> {
        sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(&mut **tx)
            .await?;
        use sqlx::Row;
        let row = sqlx::query("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_one(&mut **tx)
            .await?;
        Ok(row.try_get("id")?)
    }

    /// Lists every tag in use, with its usage count, ordered by name.
    pub async fn list_tags(&self) -> Result<Vec<TagWithCount>> {
        use sqlx::Row;
        let rows = self
            .timed("tags.list_tags", || {
                sqlx::query(
                    "SELECT t.name AS name, COUNT(ft.file_path) AS count
                     FROM tags t LEFT JOIN file_tags ft ON ft.tag_id = t.id
                     GROUP BY t.id ORDER BY t.name ASC",
                )
                .fetch_all(&self.pool)
            })
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(TagWithCount {
                    name: row.try_get("name")?,
                    count: row.try_get::<i64, _>("count")? as u64,
                })
            })
            .collect()
    }

    /// Lists every file tagged with `tag`, ordered by path.
    pub async fn files_by_tag(&self, tag: &str) -> Result<Vec<FileEntry>> {
        use sqlx::Row;
        let name = normalize_tag_name(tag);
        let rows = self
            .timed("tags.files_by_tag", || {
                sqlx::query(
                    "SELECT f.path, f.name, f.kind, f.size_bytes, f.modified_at, f.indexed_at
                     FROM files f
                     JOIN file_tags ft ON ft.file_path = f.path
                     JOIN tags t ON t.id = ft.tag_id
                     WHERE t.name = ?
                     ORDER BY f.path ASC",
                )
                .bind(&name)
                .fetch_all(&self.pool)
            })
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(FileEntry {
                    path: row.try_get("path")?,
                    name: row.try_get("name")?,
                    kind: row
                        .try_get::<String, _>("kind")?
                        .parse::<MediaKind>()
                        .map_err(StorageError::Storage)?,
                    size_bytes: row.try_get("size_bytes")?,
                    modified_at: row.try_get("modified_at")?,
                    indexed_at: row.try_get("indexed_at")?,
                })
            })
            .collect()
    }

    /// Renames `from` to `to` everywhere it is applied. If `to` already
    /// exists, files tagged `from` are merged onto the existing tag.
    pub async fn rename_tag_everywhere(&self, from: &str, to: &str) -> Result<()> {
        let from = normalize_tag_name(from);
        let to = normalize_tag_name(to);
        if to.is_empty() {
            return Err(StorageError::Validation("tag name is empty".to_string()));
        }
        self.timed("tags.rename_everywhere", || async {
            let mut tx = self.pool.begin().await?;
            use sqlx::Row;
            let from_id: Option<i64> = sqlx::query("SELECT id FROM tags WHERE name = ?")
                .bind(&from)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.try_get("id"))
                .transpose()?;
            let Some(from_id) = from_id else {
                return Ok(());
            };
            let to_id = Self::ensure_tag_in_tx(&mut tx, &to).await?;
            if from_id == to_id {
                tx.commit().await?;
                return Ok(());
            }
            sqlx::query(
                "INSERT OR IGNORE INTO file_tags (file_path, tag_id)
                 SELECT file_path, ? FROM file_tags WHERE tag_id = ?",
            )
            .bind(to_id)
            .bind(from_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query("DELETE FROM file_tags WHERE tag_id = ?")
                .bind(from_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM tags WHERE id = ?")
                .bind(from_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Deletes `tag` everywhere it is applied, including the tag row.
    pub async fn delete_tag_everywhere(&self, tag: &str) -> Result<()> {
        let name = normalize_tag_name(tag);
        self.timed("tags.delete_everywhere", || {
            sqlx::query("DELETE FROM tags WHERE name = ?")
                .bind(&name)
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    /// Deletes every tag with zero remaining file associations.
    pub async fn delete_unused_tags(&self) -> Result<u64> {
        let result = self
            .timed("tags.delete_unused", || {
                sqlx::query(
                    "DELETE FROM tags WHERE id NOT IN (SELECT DISTINCT tag_id FROM file_tags)",
                )
                .execute(&self.pool)
            })
        .await?;
        Ok(result.rows_affected())
    }
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
    async fn add_tag_is_idempotent_and_normalizes() {
        let store = store().await;
        store.add_tag("a.jpg", "  Sunset ").await.unwrap();
        store.add_tag("a.jpg", "sunset").await.unwrap();
        let tags = store.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "sunset");
        assert_eq!(tags[0].count, 1);
    }

    #[tokio::test]
    async fn remove_tag_never_applied_is_noop() {
        let store = store().await;
        store.remove_tag("a.jpg", "missing").await.unwrap();
    }

    #[tokio::test]
    async fn set_tags_replaces_full_set() {
        let store = store().await;
        store.add_tag("a.jpg", "old").await.unwrap();
        store
            .set_tags("a.jpg", &["new1".to_string(), "new2".to_string()])
            .await
            .unwrap();
        let files = store.files_by_tag("old").await.unwrap();
        assert!(files.is_empty());
        let files = store.files_by_tag("new1").await.unwrap();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn rename_tag_merges_onto_existing_target() {
        let store = store().await;
        store.add_tag("a.jpg", "old").await.unwrap();
        store.add_tag("a.jpg", "new").await.unwrap();
        store.rename_tag_everywhere("old", "new").await.unwrap();
        let tags = store.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "new");
    }

    #[tokio::test]
    async fn batch_apply_tags_adds_and_removes_together() {
        let store = store().await;
        store
            .upsert(
                "b.jpg",
                FileAttrs {
                    name: "b.jpg".to_string(),
                    kind: MediaKind::Image,
                    size_bytes: 1,
                    modified_at: 1,
                },
            )
            .await
            .unwrap();
        store.add_tag("a.jpg", "stale").await.unwrap();
        store.add_tag("b.jpg", "stale").await.unwrap();

        store
            .batch_apply_tags(
                &["a.jpg".to_string(), "b.jpg".to_string()],
                &["fresh".to_string()],
                &["stale".to_string()],
            )
            .await
            .unwrap();

        let stale_files = store.files_by_tag("stale").await.unwrap();
        assert!(stale_files.is_empty());
        let fresh_files = store.files_by_tag("fresh").await.unwrap();
        assert_eq!(fresh_files.len(), 2);
    }

    #[tokio::test]
    async fn delete_unused_tags_removes_only_orphans() {
        let store = store().await;
        store.add_tag("a.jpg", "used").await.unwrap();
        store.add_tag("a.jpg", "also-used").await.unwrap();
        store.remove_tag("a.jpg", "also-used").await.unwrap();
        let deleted = store.delete_unused_tags().await.unwrap();
        assert_eq!(deleted, 1);
        let tags = store.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "used");
    }
}
