use ferrex_model::SearchHit;

use crate::error::Result;
use crate::store::CatalogStore;

impl CatalogStore {
    /// Full-text search over file name and path, ranked by BM25 (lower is
    /// better in SQLite's `bm25()`; exposed here as a normalized score
    /// where higher means a stronger match). Ties break by path (§4.2).
    pub async fn search(&self, query: &str, limit: u32, offset: u32) -> Result<Vec<SearchHit>> {
        use sqlx::Row;
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .timed("search.search", || {
                sqlx::query(
                    "SELECT f.path AS path, f.name AS name,
                            bm25(files_fts) AS rank,
                            snippet(files_fts, 1, '[', ']', '...', 8) AS snippet
                     FROM files_fts
                     JOIN files f ON f.rowid = files_fts.rowid
                     WHERE files_fts MATCH ?
                     ORDER BY rank ASC, f.path ASC
                     LIMIT ? OFFSET ?",
                )
                .bind(query)
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool)
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let rank: f64 = row.try_get("rank").unwrap_or(0.0);
                SearchHit {
                    path: row.try_get("path").unwrap_or_default(),
                    name: row.try_get("name").unwrap_or_default(),
                    score: -rank,
                    snippet: row.try_get("snippet").unwrap_or_default(),
                }
            })
            .collect())
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
                "vacation/sunset-beach.jpg",
                FileAttrs {
                    name: "sunset-beach.jpg".to_string(),
                    kind: MediaKind::Image,
                    size_bytes: 1,
                    modified_at: 1,
                },
            )
            .await
            .unwrap();
        store
            .upsert(
                "vacation/mountain.jpg",
                FileAttrs {
                    name: "mountain.jpg".to_string(),
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
    async fn search_matches_name_tokens() {
        let store = store().await;
        let hits = store.search("sunset", 10, 0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "vacation/sunset-beach.jpg");
    }

    #[tokio::test]
    async fn search_empty_query_returns_no_hits() {
        let store = store().await;
        let hits = store.search("   ", 10, 0).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let store = store().await;
        let hits = store.search("jpg OR beach OR mountain", 1, 0).await.unwrap();
        assert!(hits.len() <= 1);
    }

    #[tokio::test]
    async fn search_pages_with_offset() {
        let store = store().await;
        let page1 = store.search("jpg OR beach OR mountain", 1, 0).await.unwrap();
        let page2 = store.search("jpg OR beach OR mountain", 1, 1).await.unwrap();
        assert_eq!(page1.len(), 1);
        assert_eq!(page2.len(), 1);
        assert_ne!(page1[0].path, page2[0].path);
    }

    #[tokio::test]
    async fn search_reflects_deletions_via_fts_sync() {
        let store = store().await;
        store
            .delete_missing(&["vacation/sunset-beach.jpg".to_string()])
            .await
            .unwrap();
        let hits = store.search("sunset", 10, 0).await.unwrap();
        assert!(hits.is_empty());
    }
}
