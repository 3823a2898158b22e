use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashSet;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use ferrex_catalog::CatalogStore;
use ferrex_config::ThumbnailEncoding;
use ferrex_contracts::Observer;
use ferrex_fs::FileSystem;
use ferrex_model::{MediaKind, MemoryPressureLevel, PressureSource, ReconcileResult, ThumbnailState};
use ferrex_transcode::probe;

use crate::cache::ThumbnailCache;
use crate::pipeline::process_image;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub workers: usize,
    pub target_edge: u32,
    pub encoding: ThumbnailEncoding,
    pub sweep_interval: Duration,
    pub sweep_batch: u32,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Fraction into the source's duration to sample the representative
    /// frame from (§4.4 step 2).
    pub video_frame_position: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            target_edge: 320,
            encoding: ThumbnailEncoding::Jpeg,
            sweep_interval: Duration::from_secs(6 * 60 * 60),
            sweep_batch: 256,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            video_frame_position: 0.1,
        }
    }
}

/// Result of [`Engine::ensure`]: either the artifact is already cached,
/// or the path has been queued and the caller should poll back later
/// (§4.4: generation is non-blocking, a caller never waits on it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    Ready(String),
    NotReady,
}

/// Worker pool that turns catalog entries into cached thumbnail
/// artifacts (C4, §4.4). Work arrives from two sources: a push of
/// new/updated paths after every indexer reconcile, and a periodic
/// sweep over files the catalog has marked missing or failed. At most
/// one generation runs per path at a time; duplicate requests for a
/// path already in flight are dropped rather than queued twice. Images
/// are decoded directly; videos have a representative frame pulled out
/// via an ffmpeg subprocess first.
pub struct Engine {
    fs: Arc<dyn FileSystem>,
    store: Arc<CatalogStore>,
    cache: ThumbnailCache,
    observer: Arc<dyn Observer>,
    pressure: Arc<dyn PressureSource>,
    media_root: PathBuf,
    config: EngineConfig,
    in_flight: Arc<DashSet<String>>,
    tx: tokio::sync::mpsc::Sender<String>,
    rx: tokio::sync::Mutex<tokio::sync::mpsc::Receiver<String>>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fs: Arc<dyn FileSystem>,
        store: Arc<CatalogStore>,
        cache: ThumbnailCache,
        observer: Arc<dyn Observer>,
        pressure: Arc<dyn PressureSource>,
        media_root: PathBuf,
        config: EngineConfig,
    ) -> Self {
        let (tx, rx) = tokio::sync::mpsc::channel(1024);
        Self {
            fs,
            store,
            cache,
            observer,
            pressure,
            media_root,
            config,
            in_flight: Arc::new(DashSet::new()),
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Non-blocking lookup: returns the cached artifact key if present,
    /// otherwise enqueues generation and returns `NotReady` immediately.
    pub async fn ensure(&self, path: &str) -> EnsureOutcome {
        if let Some(meta) = self
            .cache
            .metadata(path, self.config.target_edge, encoding_str(self.config.encoding))
            .await
        {
            return EnsureOutcome::Ready(meta.integrity.to_string());
        }
        self.enqueue(path.to_string()).await;
        EnsureOutcome::NotReady
    }

    async fn enqueue(&self, path: String) {
        if !self.in_flight.insert(path.clone()) {
            return;
        }
        if self.tx.send(path.clone()).await.is_err() {
            self.in_flight.remove(&path);
        }
    }

    /// Drives the worker pool, the reconcile-push subscription, and the
    /// periodic sweep until `shutdown` fires.
    pub async fn run(
        self: Arc<Self>,
        mut reconcile_events: broadcast::Receiver<ReconcileResult>,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut sweep_ticker = tokio::time::interval(self.config.sweep_interval);
        sweep_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut workers = JoinSet::new();
        let worker_count = self.effective_worker_count();
        for _ in 0..worker_count {
            let engine = self.clone();
            workers.spawn(engine.worker_loop());
        }

        loop {
            tokio::select! {
                _ = sweep_ticker.tick() => {
                    self.sweep_once().await;
                }
                event = reconcile_events.recv() => {
                    match event {
                        Ok(result) => {
                            for path in result.added.into_iter().chain(result.updated) {
                                self.enqueue(path).await;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => {}
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        workers.shutdown().await;
    }

    fn effective_worker_count(&self) -> usize {
        match self.pressure.level() {
            MemoryPressureLevel::Normal => self.config.workers,
            MemoryPressureLevel::High => (self.config.workers / 2).max(1),
            MemoryPressureLevel::Critical => 1,
        }
    }

    async fn sweep_once(&self) {
        let pending = match self.store.files_pending_thumbnail(self.config.sweep_batch).await {
            Ok(p) => p,
            Err(_) => return,
        };
        for status in pending {
            self.enqueue(status.path).await;
        }
    }

    async fn worker_loop(self: Arc<Self>) {
        loop {
            if self.pressure.level() == MemoryPressureLevel::Critical {
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }

            let path = {
                let mut rx = self.rx.lock().await;
                match rx.recv().await {
                    Some(p) => p,
                    None => return,
                }
            };

            self.generate_one(&path).await;
            self.in_flight.remove(&path);
        }
    }

    async fn generate_one(&self, path: &str) {
        let start = Instant::now();
        match self.generate(path).await {
            Ok(()) => {
                self.observer.thumbnail_generated(start.elapsed(), false);
            }
            Err(kind) => {
                self.observer.thumbnail_failed(kind);
                let _ = self
                    .store
                    .mark_thumbnail(path, ThumbnailState::Failed, None)
                    .await;
            }
        }
    }

    /// Check, decode, resize, encode, write to cache, record outcome
    /// (§4.4 steps 1-5). Images are read straight off disk; videos have
    /// a representative frame extracted via an external ffmpeg process
    /// first, then go through the same resize/encode path as an image.
    async fn generate(&self, path: &str) -> Result<(), &'static str> {
        let entry = self.store.get(path).await.map_err(|_| "missing")?;

        if let Some(meta) = self
            .cache
            .metadata(path, self.config.target_edge, encoding_str(self.config.encoding))
            .await
        {
            let artifact_mtime = (meta.time / 1000) as i64;
            if entry.modified_at <= artifact_mtime {
                return Ok(());
            }
        }

        let bytes = match entry.kind {
            MediaKind::Image => self
                .fs
                .read(&self.media_root.join(path))
                .await
                .map_err(|_| "read_failed")?,
            MediaKind::Video => {
                let abs = self.media_root.join(path);
                let info = probe(&self.config.ffprobe_path, &abs)
                    .await
                    .map_err(|_| "probe_failed")?;
                let timestamp = (info.duration_secs * self.config.video_frame_position).max(0.0);
                ferrex_transcode::extract_frame(&self.config.ffmpeg_path, &abs, timestamp)
                    .await
                    .map_err(|_| "frame_extraction_failed")?
            }
            _ => return Err("unsupported_kind"),
        };

        let target_edge = self.config.target_edge;
        let encoding = self.config.encoding;
        let encoded = tokio::task::spawn_blocking(move || process_image(&bytes, target_edge, encoding))
            .await
            .map_err(|_| "worker_panicked")?
            .map_err(|_| "decode_failed")?;

        let key = self
            .cache
            .put(path, target_edge, encoding_str(encoding), encoded)
            .await
            .map_err(|_| "cache_write_failed")?;

        self.store
            .mark_thumbnail(path, ThumbnailState::Generated, Some(&key))
            .await
            .map_err(|_| "mark_failed")?;

        Ok(())
    }
}

fn encoding_str(encoding: ThumbnailEncoding) -> &'static str {
    match encoding {
        ThumbnailEncoding::Png => "png",
        ThumbnailEncoding::Jpeg => "jpeg",
    }
}
