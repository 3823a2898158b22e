use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ferrex_contracts::Observer;
use ferrex_fs::FileSystem;
use ferrex_model::ReconcileResult;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::indexer::Indexer;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub full_interval: Duration,
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            full_interval: Duration::from_secs(1800),
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Cheap root-level change signal: directory entry count and max mtime
/// observed directly under the media root, without descending further.
/// A poll tick only triggers a full index when this changes (§4.3
/// scheduling model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct RootSignal {
    entry_count: usize,
    max_mtime: i64,
}

async fn sample_root_signal(fs: &dyn FileSystem, root: &std::path::Path) -> RootSignal {
    match fs.read_dir(root).await {
        Ok(entries) => {
            let mut max_mtime = 0;
            for entry in &entries {
                if let Ok(stat) = fs.stat(&entry.path).await {
                    max_mtime = max_mtime.max(stat.modified_unix);
                }
            }
            RootSignal {
                entry_count: entries.len(),
                max_mtime,
            }
        }
        Err(_) => RootSignal::default(),
    }
}

/// Drives the indexer on its scheduled cadence: a full index on start
/// and every `full_interval`, plus a lighter poll every `poll_interval`
/// that only escalates to a full index when the root signal moved
/// (§4.3). Publishes a [`ReconcileResult`] after every full run that
/// actually completes (cancelled runs publish nothing).
pub struct Scheduler {
    indexer: Arc<Indexer>,
    fs: Arc<dyn FileSystem>,
    observer: Arc<dyn Observer>,
    media_root: PathBuf,
    config: SchedulerConfig,
    events: broadcast::Sender<ReconcileResult>,
}

impl Scheduler {
    pub fn new(
        indexer: Arc<Indexer>,
        fs: Arc<dyn FileSystem>,
        observer: Arc<dyn Observer>,
        media_root: PathBuf,
        config: SchedulerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            indexer,
            fs,
            observer,
            media_root,
            config,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReconcileResult> {
        self.events.subscribe()
    }

    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if let Err(err) = self.run_full().await {
            warn!(%err, "initial full index failed");
        }

        let mut full_ticker = tokio::time::interval(self.config.full_interval);
        full_ticker.reset();
        let mut poll_ticker = tokio::time::interval(self.config.poll_interval);
        poll_ticker.reset();
        let mut last_signal = sample_root_signal(self.fs.as_ref(), &self.media_root).await;

        loop {
            tokio::select! {
                _ = full_ticker.tick() => {
                    if let Err(err) = self.run_full().await {
                        warn!(%err, "scheduled full index failed");
                    }
                    last_signal = sample_root_signal(self.fs.as_ref(), &self.media_root).await;
                }
                _ = poll_ticker.tick() => {
                    let signal = sample_root_signal(self.fs.as_ref(), &self.media_root).await;
                    if signal != last_signal {
                        info!("root signal changed, triggering full index");
                        if let Err(err) = self.run_full().await {
                            warn!(%err, "poll-triggered full index failed");
                        }
                        last_signal = signal;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("indexer scheduler shutting down");
                        return;
                    }
                }
            }
        }
    }

    async fn run_full(&self) -> Result<(), ferrex_catalog::StorageError> {
        let result = self.indexer.run_once().await?;
        let _ = self.events.send(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ferrex_catalog::CatalogStore;
    use ferrex_contracts::NullObserver;
    use ferrex_fs::{DirEntry, InMemoryFs};

    use super::*;
    use crate::indexer::IndexerConfig;

    #[tokio::test]
    async fn scheduler_publishes_reconcile_result_on_start() {
        let fs = Arc::new(InMemoryFs::default());
        fs.add_dir(
            "/root",
            vec![DirEntry {
                path: PathBuf::from("/root/a.jpg"),
                is_dir: false,
            }],
        );
        fs.add_file("/root/a.jpg", b"data".to_vec(), 1);

        let store = CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap();
        let indexer = Arc::new(Indexer::new(
            fs.clone() as Arc<dyn FileSystem>,
            store,
            Arc::new(NullObserver::default()),
            PathBuf::from("/root"),
            IndexerConfig::default(),
        ));
        let scheduler = Arc::new(Scheduler::new(
            indexer,
            fs as Arc<dyn FileSystem>,
            Arc::new(NullObserver::default()),
            PathBuf::from("/root"),
            SchedulerConfig {
                full_interval: Duration::from_secs(3600),
                poll_interval: Duration::from_secs(3600),
            },
        ));
        let mut events = scheduler.subscribe();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(rx));

        let result = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("expected a reconcile result")
            .unwrap();
        assert_eq!(result.added, vec!["a.jpg".to_string()]);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
