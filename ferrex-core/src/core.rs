use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use ferrex_catalog::{CatalogStore, CleanupTask};
use ferrex_config::{validate, Config};
use ferrex_contracts::Observer;
use ferrex_fs::{FileSystem, ResilientFs, RetryConfig, VolumeResolver};
use ferrex_indexer::{Indexer, IndexerConfig, Scheduler, SchedulerConfig};
use ferrex_memory::{MemoryHandle, MemoryMonitor};
use ferrex_model::PressureSource;
use ferrex_thumbnails::{Engine as ThumbnailEngine, EngineConfig as ThumbnailEngineConfig};
use ferrex_transcode::{detect_acceleration, Engine as TranscodeEngine, EngineConfig as TranscodeEngineConfig};

use crate::error::{BuildError, Result};

/// One component's running background task: the shutdown signal that
/// stops it and the handle that confirms it has.
struct TaskHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Signals shutdown and waits up to `timeout` for the task to exit.
    /// A timeout is logged, not propagated; shutdown proceeds to the
    /// next step regardless (§4.9: bounded per-step teardown).
    async fn stop(self, label: &str, timeout: Duration) {
        let _ = self.shutdown.send(true);
        match tokio::time::timeout(timeout, self.join).await {
            Ok(Ok(())) => info!(component = label, "stopped"),
            Ok(Err(err)) => warn!(component = label, %err, "task panicked during shutdown"),
            Err(_) => warn!(component = label, ?timeout, "did not stop within timeout, abandoning"),
        }
    }
}

/// The running set of background tasks, held only while [`Core::start`]
/// has been called and [`Core::shutdown`] has not yet run.
struct Running {
    memory: TaskHandle,
    cleanup: TaskHandle,
    scheduler: TaskHandle,
    thumbnails: TaskHandle,
}

/// Wires every component (C1-C8) into one process lifecycle and drives
/// the catalog core's startup/shutdown order (§4.9). Construction is
/// kept separate from `start`: `start` only spawns the tasks that loop.
pub struct Core {
    config: Config,
    fs: Arc<dyn FileSystem>,
    store: CatalogStore,
    memory: Arc<MemoryMonitor>,
    memory_handle: MemoryHandle,
    scheduler: Arc<Scheduler>,
    cleanup: Mutex<Option<CleanupTask>>,
    thumbnails: Arc<ThumbnailEngine>,
    transcode: Arc<TranscodeEngine>,
    running: Mutex<Option<Running>>,
}

impl Core {
    /// Builds every component without starting any background task
    /// (startup order, leaves first: C8 wiring is the caller's
    /// `observer`; C6 memory; C2 catalog open+migrate; C1 volume map;
    /// C7 cleanup task; C3 indexer+scheduler; C4 thumbnail engine; C5
    /// transcode engine).
    pub async fn build(config: Config, observer: Arc<dyn Observer>) -> Result<Self> {
        validate(&config).map_err(BuildError::InvalidConfig)?;

        let memory = Arc::new(MemoryMonitor::new(&config, observer.clone()));
        let memory_handle = memory.handle();

        let store = CatalogStore::open(
            &config.database_dir,
            observer.clone(),
            Duration::from_millis(config.slow_query_threshold_ms),
            config.session_window_secs,
            config.session_extend_threshold,
        )
        .await?;

        let mounts = config
            .volume_map
            .iter()
            .map(|entry| {
                let label: &'static str = Box::leak(entry.label.clone().into_boxed_str());
                (entry.prefix.to_string_lossy().into_owned(), label)
            })
            .collect();
        let fs: Arc<dyn FileSystem> = Arc::new(ResilientFs::new(
            RetryConfig::default(),
            VolumeResolver::new(mounts),
            observer.clone(),
        ));

        let indexer = Arc::new(Indexer::new(
            fs.clone(),
            store.clone(),
            observer.clone(),
            config.media_root.clone(),
            IndexerConfig {
                workers: config.index_workers,
                ..IndexerConfig::default()
            },
        ));
        let scheduler = Arc::new(Scheduler::new(
            indexer,
            fs.clone(),
            observer.clone(),
            config.media_root.clone(),
            SchedulerConfig {
                full_interval: Duration::from_secs(config.index_full_interval_secs),
                poll_interval: Duration::from_secs(config.index_poll_interval_secs),
            },
        ));

        let cleanup = CleanupTask::new(store.clone(), Duration::from_secs(config.session_cleanup_interval_secs));

        let thumb_cache = ferrex_thumbnails::ThumbnailCache::new(config.cache_dir.clone());
        let pressure: Arc<dyn PressureSource> = Arc::new(memory_handle.clone());
        let thumbnails = Arc::new(ThumbnailEngine::new(
            fs.clone(),
            Arc::new(store.clone()),
            thumb_cache,
            observer.clone(),
            pressure,
            config.media_root.clone(),
            ThumbnailEngineConfig {
                workers: config.thumb_workers,
                target_edge: config.thumb_target_edge,
                encoding: config.thumb_encoding,
                sweep_interval: Duration::from_secs(config.thumb_sweep_interval_secs),
                ..ThumbnailEngineConfig::default()
            },
        ));

        let transcode_cache = ferrex_transcode::TranscodeCache::new(config.cache_dir.clone());
        let transcode_config = TranscodeEngineConfig {
            global_concurrency: config.transcode_global_concurrency,
            cache_sweep_ceiling_bytes: config.transcode_cache_max_bytes,
            ..TranscodeEngineConfig::default()
        };
        let accel = detect_acceleration(&transcode_config.ffmpeg_path, config.transcode_acceleration).await;
        let transcode = Arc::new(TranscodeEngine::new(
            config.media_root.clone(),
            transcode_cache,
            observer.clone(),
            transcode_config,
            accel,
        ));

        Ok(Self {
            config,
            fs,
            store,
            memory,
            memory_handle,
            scheduler,
            cleanup: Mutex::new(Some(cleanup)),
            thumbnails,
            transcode,
            running: Mutex::new(None),
        })
    }

    pub fn filesystem(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.store
    }

    pub fn memory(&self) -> MemoryHandle {
        self.memory_handle.clone()
    }

    pub fn thumbnails(&self) -> Arc<ThumbnailEngine> {
        self.thumbnails.clone()
    }

    pub fn transcode(&self) -> Arc<TranscodeEngine> {
        self.transcode.clone()
    }

    pub fn media_root(&self) -> &Path {
        &self.config.media_root
    }

    /// Spawns every background task in startup order: C6 memory sampler,
    /// C7 cleanup sweep, C3 indexer scheduler, C4 thumbnail worker pool.
    /// C5 is request-driven and has no loop to start. A no-op if already
    /// started.
    pub async fn start(self: &Arc<Self>) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            warn!("start called while already running, ignoring");
            return;
        }

        let (memory_tx, memory_rx) = watch::channel(false);
        let memory = self.memory.clone();
        let memory_join = tokio::spawn(async move { memory.run(memory_rx).await });

        let (cleanup_tx, cleanup_rx) = watch::channel(false);
        let cleanup_task = self.cleanup.lock().await.take().expect("cleanup task taken twice");
        let cleanup_join = tokio::spawn(cleanup_task.run(cleanup_rx));

        let (scheduler_tx, scheduler_rx) = watch::channel(false);
        let scheduler = self.scheduler.clone();
        let scheduler_join = tokio::spawn(async move { scheduler.run(scheduler_rx).await });

        let (thumb_tx, thumb_rx) = watch::channel(false);
        let thumbnails = self.thumbnails.clone();
        let reconcile_events = self.scheduler.subscribe();
        let thumb_join = tokio::spawn(async move { thumbnails.run(reconcile_events, thumb_rx).await });

        *running = Some(Running {
            memory: TaskHandle {
                shutdown: memory_tx,
                join: memory_join,
            },
            cleanup: TaskHandle {
                shutdown: cleanup_tx,
                join: cleanup_join,
            },
            scheduler: TaskHandle {
                shutdown: scheduler_tx,
                join: scheduler_join,
            },
            thumbnails: TaskHandle {
                shutdown: thumb_tx,
                join: thumb_join,
            },
        });
        info!("core started");
    }

    /// Tears down in reverse startup order, each step bounded by
    /// `per_step_timeout` (§4.9): C5 cancel in-flight transcodes, C4
    /// drain-or-abandon the thumbnail pool, C3 let the indexer finish
    /// its current batch, C7 stop the cleanup loop, C6 stop the memory
    /// sampler, then close the catalog's connection pool (C2 checkpoint).
    /// C8 (the observer) is owned by the caller and outlives `Core`.
    pub async fn shutdown(&self, per_step_timeout: Duration) {
        self.transcode.shutdown().await;

        let Some(running) = self.running.lock().await.take() else {
            info!("shutdown called before start, nothing to stop");
            return;
        };

        running.thumbnails.stop("thumbnails", per_step_timeout).await;
        running.scheduler.stop("indexer-scheduler", per_step_timeout).await;
        running.cleanup.stop("catalog-cleanup", per_step_timeout).await;
        running.memory.stop("memory-monitor", per_step_timeout).await;

        self.store.pool().close().await;
        info!("core shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrex_contracts::NullObserver;

    fn test_config(root: &std::path::Path) -> Config {
        Config {
            media_root: root.join("media"),
            cache_dir: root.join("cache"),
            database_dir: root.join("db"),
            index_full_interval_secs: 3600,
            index_poll_interval_secs: 3600,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn build_then_start_then_shutdown_runs_clean() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("media")).unwrap();

        let core = Arc::new(
            Core::build(test_config(dir.path()), Arc::new(NullObserver))
                .await
                .unwrap(),
        );
        core.start().await;
        core.shutdown(Duration::from_secs(2)).await;
    }

    #[tokio::test]
    async fn build_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.index_workers = 0;

        let err = Core::build(config, Arc::new(NullObserver)).await.unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn shutdown_before_start_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("media")).unwrap();

        let core = Core::build(test_config(dir.path()), Arc::new(NullObserver))
            .await
            .unwrap();
        core.shutdown(Duration::from_secs(1)).await;
    }
}
