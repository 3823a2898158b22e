use ferrex_model::{
    validate_canonical_path, unix_now, FileAttrs, FileEntry, LibraryStats, ListOptions, MediaKind,
    SortField, SortOrder,
};

use crate::error::{Result, StorageError};
use crate::store::CatalogStore;

struct FileRow {
    path: String,
    name: String,
    kind: String,
    size_bytes: i64,
    modified_at: i64,
    indexed_at: i64,
}

impl TryFrom<FileRow> for FileEntry {
    type Error = StorageError;

    fn try_from(row: FileRow) -> Result<Self> {
        Ok(FileEntry {
            path: row.path,
            name: row.name,
            kind: row
                .kind
                .parse::<MediaKind>()
                .map_err(StorageError::Storage)?,
            size_bytes: row.size_bytes,
            modified_at: row.modified_at,
            indexed_at: row.indexed_at,
        })
    }
}

impl CatalogStore {
    /// Inserts or updates one file row. Callers doing bulk work should
    /// prefer [`Self::upsert_batch`] so the FTS update stays within the
    /// same transaction as the whole batch (§3 invariant 5).
    pub async fn upsert(&self, path: &str, attrs: FileAttrs) -> Result<()> {
        self.timed("files.upsert", || async {
            let mut tx = self.pool.begin().await?;
            Self::upsert_in_tx(&mut tx, path, &attrs).await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Upserts a whole indexer batch atomically: base rows and FTS rows
    /// become visible together or not at all.
    pub async fn upsert_batch(&self, entries: &[(String, FileAttrs)]) -> Result<()> {
        self.timed("files.upsert_batch", || async {
            let mut tx = self.pool.begin().await?;
            for (path, attrs) in entries {
                Self::upsert_in_tx(&mut tx, path, attrs).await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn upsert_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        path: &str,
        attrs: &FileAttrs,
    ) -> Result<()> {
        validate_canonical_path(path).map_err(StorageError::Validation)?;
        let now = unix_now();
        sqlx::query(
            "INSERT INTO files (path, name, kind, size_bytes, modified_at, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(path) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                size_bytes = excluded.size_bytes,
                modified_at = excluded.modified_at,
                indexed_at = excluded.indexed_at",
        )
        .bind(path)
        .bind(&attrs.name)
        .bind(attrs.kind.as_str())
        .bind(attrs.size_bytes)
        .bind(attrs.modified_at)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Deletes every path in `paths` along with their FTS rows,
    /// `file_tags`, and `thumbnail_status` (cascade, §3). Deleting an
    /// empty set is a no-op (§8 idempotence).
    pub async fn delete_missing(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.timed("files.delete_missing", || async {
            let mut tx = self.pool.begin().await?;
            for path in paths {
                sqlx::query("DELETE FROM files WHERE path = ?1")
                    .bind(path)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn get(&self, path: &str) -> Result<FileEntry> {
        use sqlx::Row;
        let row = self
            .timed("files.get", || async {
                sqlx::query(
                    "SELECT path, name, kind, size_bytes, modified_at, indexed_at
                     FROM files WHERE path = ?1",
                )
                .bind(path)
                .fetch_optional(&self.pool)
                .await
            })
            .await?
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;

        FileRow {
            path: row.try_get("path")?,
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            size_bytes: row.try_get("size_bytes")?,
            modified_at: row.try_get("modified_at")?,
            indexed_at: row.try_get("indexed_at")?,
        }
        .try_into()
    }

    /// Lists files directly under `dir` (one level), applying the fixed
    /// filter/sort/page grammar (§9 redesign guidance).
    pub async fn list(&self, dir: &str, options: &ListOptions) -> Result<Vec<FileEntry>> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let mut sql = String::from(
            "SELECT DISTINCT f.path, f.name, f.kind, f.size_bytes, f.modified_at, f.indexed_at
             FROM files f",
        );
        if options.filter.tags.is_some() {
            sql.push_str(
                " JOIN file_tags ft ON ft.file_path = f.path JOIN tags t ON t.id = ft.tag_id",
            );
        }
        if options.filter.favorited == Some(true) {
            sql.push_str(" JOIN favorites fav ON fav.path = f.path");
        }
        // Every placeholder below is unnumbered `?`; bind order must
        // match the order they appear in the generated SQL exactly.
        sql.push_str(" WHERE f.path LIKE ? || '%' AND instr(substr(f.path, length(?) + 1), '/') = 0");

        if let Some(kinds) = &options.filter.kinds {
            let placeholders = kinds.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            sql.push_str(&format!(" AND f.kind IN ({placeholders})"));
        }
        if let Some(tags) = &options.filter.tags {
            let placeholders = tags.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            sql.push_str(&format!(" AND t.name IN ({placeholders})"));
        }

        let order_col = match options.sort.field {
            SortField::Name => "f.name",
            SortField::Path => "f.path",
            SortField::ModifiedAt => "f.modified_at",
            SortField::SizeBytes => "f.size_bytes",
        };
        let order_dir = match options.sort.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        sql.push_str(&format!(
            " ORDER BY {order_col} {order_dir}, f.path ASC LIMIT ? OFFSET ?"
        ));

        let mut query = sqlx::query(&sql).bind(prefix.clone()).bind(prefix);
        if let Some(kinds) = &options.filter.kinds {
            for kind in kinds {
                query = query.bind(kind.as_str());
            }
        }
        if let Some(tags) = &options.filter.tags {
            for tag in tags {
                query = query.bind(tag.clone());
            }
        }
        query = query
            .bind(options.page.limit as i64)
            .bind(options.page.offset as i64);

        let rows = self.timed("files.list", || query.fetch_all(&self.pool)).await?;
        use sqlx::Row;
        rows.into_iter()
            .map(|row| {
                let file_row = FileRow {
                    path: row.try_get("path")?,
                    name: row.try_get("name")?,
                    kind: row.try_get("kind")?,
                    size_bytes: row.try_get("size_bytes")?,
                    modified_at: row.try_get("modified_at")?,
                    indexed_at: row.try_get("indexed_at")?,
                };
                FileEntry::try_from(file_row)
            })
            .collect()
    }

    /// Every known path, unordered. Used by the indexer to distinguish
    /// newly-seen paths from re-touched ones across a reconcile pass.
    pub async fn all_paths(&self) -> Result<std::collections::HashSet<String>> {
        use sqlx::Row;
        let rows = self
            .timed("files.all_paths", || {
                sqlx::query("SELECT path FROM files").fetch_all(&self.pool)
            })
            .await?;
        rows.into_iter()
            .map(|row| row.try_get("path").map_err(Into::into))
            .collect()
    }

    /// Every path whose `indexed_at` predates `threshold`: the set an
    /// indexer run did not touch this pass, and therefore the deletion
    /// candidates for `delete_missing` (§4.3 step 3).
    pub async fn paths_indexed_before(&self, threshold: i64) -> Result<Vec<String>> {
        use sqlx::Row;
        let rows = self
            .timed("files.paths_indexed_before", || {
                sqlx::query("SELECT path FROM files WHERE indexed_at < ?")
                    .bind(threshold)
                    .fetch_all(&self.pool)
            })
            .await?;
        rows.into_iter()
            .map(|row| row.try_get("path").map_err(Into::into))
            .collect()
    }

    pub async fn stats(&self) -> Result<LibraryStats> {
        use sqlx::Row;
        let (row, folders) = self
            .timed("files.stats", || async {
                let row = sqlx::query(
                    "SELECT
                        SUM(CASE WHEN kind = 'image' THEN 1 ELSE 0 END) AS images,
                        SUM(CASE WHEN kind = 'video' THEN 1 ELSE 0 END) AS videos,
                        SUM(CASE WHEN kind = 'playlist' THEN 1 ELSE 0 END) AS playlists
                     FROM files",
                )
                .fetch_one(&self.pool)
                .await?;

                let folders = sqlx::query(
                    "SELECT COUNT(DISTINCT substr(path, 1, length(path) - length(name) - 1)) AS folders
                     FROM files WHERE instr(path, '/') > 0",
                )
                .fetch_one(&self.pool)
                .await?;

                Ok((row, folders))
            })
            .await?;

        Ok(LibraryStats {
            images: row.try_get::<Option<i64>, _>("images")?.unwrap_or(0) as u64,
            videos: row.try_get::<Option<i64>, _>("videos")?.unwrap_or(0) as u64,
            playlists: row.try_get::<Option<i64>, _>("playlists")?.unwrap_or(0) as u64,
            folders: folders.try_get::<Option<i64>, _>("folders")?.unwrap_or(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ferrex_contracts::NullObserver;
    use ferrex_model::{ListOptions, MediaKind, Page, Sort, SortField, SortOrder};

    use super::*;

    async fn store() -> CatalogStore {
        CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap()
    }

    fn attrs(name: &str, kind: MediaKind) -> FileAttrs {
        FileAttrs {
            name: name.to_string(),
            kind,
            size_bytes: 1024,
            modified_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = store().await;
        store
            .upsert("photos/cat.jpg", attrs("cat.jpg", MediaKind::Image))
            .await
            .unwrap();

        let entry = store.get("photos/cat.jpg").await.unwrap();
        assert_eq!(entry.name, "cat.jpg");
        assert_eq!(entry.kind, MediaKind::Image);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_conflict() {
        let store = store().await;
        store
            .upsert("photos/cat.jpg", attrs("cat.jpg", MediaKind::Image))
            .await
            .unwrap();
        store
            .upsert("photos/cat.jpg", attrs("cat-renamed.jpg", MediaKind::Image))
            .await
            .unwrap();

        let entry = store.get("photos/cat.jpg").await.unwrap();
        assert_eq!(entry.name, "cat-renamed.jpg");
    }

    #[tokio::test]
    async fn upsert_rejects_non_canonical_path() {
        let store = store().await;
        let err = store
            .upsert("../escape.jpg", attrs("escape.jpg", MediaKind::Image))
            .await;
        assert!(matches!(err, Err(StorageError::Validation(_))));
    }

    #[tokio::test]
    async fn get_missing_path_is_not_found() {
        let store = store().await;
        let err = store.get("nope.jpg").await;
        assert!(matches!(err, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_missing_removes_rows_and_is_idempotent_on_empty() {
        let store = store().await;
        store
            .upsert("a.jpg", attrs("a.jpg", MediaKind::Image))
            .await
            .unwrap();
        store
            .delete_missing(&["a.jpg".to_string()])
            .await
            .unwrap();
        assert!(matches!(
            store.get("a.jpg").await,
            Err(StorageError::NotFound(_))
        ));
        store.delete_missing(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn list_returns_only_direct_children_one_level_deep() {
        let store = store().await;
        store
            .upsert("movies/a.mp4", attrs("a.mp4", MediaKind::Video))
            .await
            .unwrap();
        store
            .upsert(
                "movies/nested/b.mp4",
                attrs("b.mp4", MediaKind::Video),
            )
            .await
            .unwrap();

        let results = store
            .list("movies", &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "movies/a.mp4");
    }

    #[tokio::test]
    async fn list_honors_kind_filter_and_sort_order() {
        let store = store().await;
        store
            .upsert("lib/b.jpg", attrs("b.jpg", MediaKind::Image))
            .await
            .unwrap();
        store
            .upsert("lib/a.jpg", attrs("a.jpg", MediaKind::Image))
            .await
            .unwrap();
        store
            .upsert("lib/c.mp4", attrs("c.mp4", MediaKind::Video))
            .await
            .unwrap();

        let options = ListOptions {
            filter: ferrex_model::ListFilter {
                kinds: Some(vec![MediaKind::Image]),
                tags: None,
                favorited: None,
            },
            sort: Sort {
                field: SortField::Name,
                order: SortOrder::Desc,
            },
            page: Page::default(),
        };
        let results = store.list("lib", &options).await.unwrap();
        let names: Vec<_> = results.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["b.jpg", "a.jpg"]);
    }

    #[tokio::test]
    async fn list_pages_with_offset_and_limit() {
        let store = store().await;
        for n in 0..5 {
            store
                .upsert(
                    &format!("lib/{n}.jpg"),
                    attrs(&format!("{n}.jpg"), MediaKind::Image),
                )
                .await
                .unwrap();
        }
        let options = ListOptions {
            page: Page {
                offset: 2,
                limit: 2,
            },
            ..Default::default()
        };
        let results = store.list("lib", &options).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "2.jpg");
    }

    #[tokio::test]
    async fn paths_indexed_before_finds_stale_generation() {
        let store = store().await;
        store
            .upsert("old.jpg", attrs("old.jpg", MediaKind::Image))
            .await
            .unwrap();
        let cutoff = ferrex_model::unix_now() + 10;
        store
            .upsert("new.jpg", attrs("new.jpg", MediaKind::Image))
            .await
            .unwrap();

        let stale = store.paths_indexed_before(cutoff).await.unwrap();
        assert!(stale.contains(&"old.jpg".to_string()));
        assert!(stale.contains(&"new.jpg".to_string()));

        let none_stale = store.paths_indexed_before(0).await.unwrap();
        assert!(none_stale.is_empty());
    }

    #[tokio::test]
    async fn stats_aggregates_counts_by_kind_and_folders() {
        let store = store().await;
        store
            .upsert("a/1.jpg", attrs("1.jpg", MediaKind::Image))
            .await
            .unwrap();
        store
            .upsert("a/2.mp4", attrs("2.mp4", MediaKind::Video))
            .await
            .unwrap();
        store
            .upsert("b/3.m3u", attrs("3.m3u", MediaKind::Playlist))
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.images, 1);
        assert_eq!(stats.videos, 1);
        assert_eq!(stats.playlists, 1);
        assert_eq!(stats.folders, 2);
    }
}
