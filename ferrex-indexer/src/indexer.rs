use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ferrex_catalog::CatalogStore;
use ferrex_contracts::Observer;
use ferrex_fs::FileSystem;
use ferrex_model::{unix_now, IndexerStatus, ReconcileResult};
use tokio::sync::{mpsc, RwLock};

use crate::batcher::run_batcher;
use crate::walker::walk;

#[derive(Debug, Clone, Copy)]
pub struct IndexerConfig {
    pub workers: usize,
    pub batch_size: usize,
    pub batch_timeout: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            batch_size: 256,
            batch_timeout: Duration::from_secs(2),
        }
    }
}

/// Runs one full reconcile pass: walk the media root, upsert scanned
/// files in batches, then delete every catalog path not touched this
/// pass (§4.3). The pre-run timestamp is the "seen" boundary so the
/// run never observes its own in-flight writes.
pub struct Indexer {
    fs: Arc<dyn FileSystem>,
    store: CatalogStore,
    observer: Arc<dyn Observer>,
    media_root: PathBuf,
    config: IndexerConfig,
    status: Arc<RwLock<IndexerStatus>>,
}

impl Indexer {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        store: CatalogStore,
        observer: Arc<dyn Observer>,
        media_root: PathBuf,
        config: IndexerConfig,
    ) -> Self {
        Self {
            fs,
            store,
            observer,
            media_root,
            config,
            status: Arc::new(RwLock::new(IndexerStatus::default())),
        }
    }

    pub fn status_handle(&self) -> Arc<RwLock<IndexerStatus>> {
        self.status.clone()
    }

    /// Runs one reconcile pass to completion. Worker count in
    /// [`IndexerConfig`] bounds how many directories the walker may
    /// have outstanding at once; the walker itself is currently a
    /// single cooperative task fed by a bounded channel, so this is an
    /// upper bound rather than a literal thread pool (§4.3 scheduling).
    pub async fn run_once(&self) -> Result<ReconcileResult, ferrex_catalog::StorageError> {
        {
            let mut status = self.status.write().await;
            status.running = true;
        }

        let pre_existing: HashSet<String> = self.store.all_paths().await?;
        let start = Instant::now();

        let (tx, rx) = mpsc::channel(1024);
        let walk_fs = self.fs.clone();
        let walk_root = self.media_root.clone();
        let walk_observer = self.observer.clone();
        let walk_handle = tokio::spawn(walk(walk_fs, walk_root, walk_observer, tx));

        let touched = run_batcher(rx, &self.store, self.config.batch_size, self.config.batch_timeout)
            .await?;
        let _ = walk_handle.await;

        let touched_set: HashSet<String> = touched.iter().cloned().collect();
        let mut added = Vec::new();
        let mut updated = Vec::new();
        for path in touched {
            if pre_existing.contains(&path) {
                updated.push(path);
            } else {
                added.push(path);
            }
        }

        // Removed paths are derived from this pass's own touched set
        // rather than a wall-clock `indexed_at` cutoff (`unix_now()` is
        // second-granularity and a fast pass can complete within the
        // same second it started, making a `<` comparison unreliable).
        let removed: Vec<String> = pre_existing
            .into_iter()
            .filter(|path| !touched_set.contains(path))
            .collect();
        self.store.delete_missing(&removed).await?;

        let result = ReconcileResult {
            added,
            updated,
            removed,
        };
        let (added_n, updated_n, removed_n) = result.counts();
        self.observer
            .indexer_reconcile(added_n, updated_n, removed_n, start.elapsed());

        let mut status = self.status.write().await;
        status.running = false;
        status.last_run_at = Some(unix_now());
        status.last_result = Some(result.clone());

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ferrex_contracts::NullObserver;
    use ferrex_fs::{DirEntry, InMemoryFs};

    use super::*;

    fn store_fs() -> Arc<InMemoryFs> {
        let fs = Arc::new(InMemoryFs::default());
        fs.add_dir(
            "/root",
            vec![DirEntry {
                path: PathBuf::from("/root/a.jpg"),
                is_dir: false,
            }],
        );
        fs.add_file("/root/a.jpg", b"data".to_vec(), 100);
        fs
    }

    #[tokio::test]
    async fn run_once_upserts_scanned_files_and_reports_counts() {
        let fs = store_fs();
        let store = CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap();
        let indexer = Indexer::new(
            fs,
            store.clone(),
            Arc::new(NullObserver::default()),
            PathBuf::from("/root"),
            IndexerConfig::default(),
        );

        let result = indexer.run_once().await.unwrap();
        assert_eq!(result.added, vec!["a.jpg".to_string()]);
        assert!(result.removed.is_empty());
        assert_eq!(store.stats().await.unwrap().images, 1);
    }

    #[tokio::test]
    async fn run_once_removes_paths_no_longer_seen() {
        let fs = store_fs();
        let store = CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap();
        store
            .upsert(
                "stale.jpg",
                ferrex_model::FileAttrs {
                    name: "stale.jpg".to_string(),
                    kind: ferrex_model::MediaKind::Image,
                    size_bytes: 1,
                    modified_at: 1,
                },
            )
            .await
            .unwrap();

        let indexer = Indexer::new(
            fs,
            store.clone(),
            Arc::new(NullObserver::default()),
            PathBuf::from("/root"),
            IndexerConfig::default(),
        );
        let result = indexer.run_once().await.unwrap();
        assert_eq!(result.removed, vec!["stale.jpg".to_string()]);
        assert!(store.get("stale.jpg").await.is_err());
    }

    #[tokio::test]
    async fn run_once_reports_updated_for_previously_seen_paths() {
        let fs = store_fs();
        let store = CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap();
        store
            .upsert(
                "a.jpg",
                ferrex_model::FileAttrs {
                    name: "a.jpg".to_string(),
                    kind: ferrex_model::MediaKind::Image,
                    size_bytes: 1,
                    modified_at: 1,
                },
            )
            .await
            .unwrap();

        let indexer = Indexer::new(
            fs,
            store,
            Arc::new(NullObserver::default()),
            PathBuf::from("/root"),
            IndexerConfig::default(),
        );
        let result = indexer.run_once().await.unwrap();
        assert_eq!(result.updated, vec!["a.jpg".to_string()]);
        assert!(result.added.is_empty());
    }

    #[tokio::test]
    async fn status_reflects_completed_run() {
        let fs = store_fs();
        let store = CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap();
        let indexer = Indexer::new(
            fs,
            store,
            Arc::new(NullObserver::default()),
            PathBuf::from("/root"),
            IndexerConfig::default(),
        );
        indexer.run_once().await.unwrap();
        let status = indexer.status_handle().read().await.clone();
        assert!(!status.running);
        assert!(status.last_result.is_some());
    }
}
