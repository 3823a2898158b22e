use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{watch, Notify, Semaphore};

use ferrex_contracts::Observer;

use crate::cache::TranscodeCache;
use crate::error::{Result, TranscodeError};
use crate::hardware::hwaccel_args;
use crate::probe::{probe, satisfies_target, ProbeInfo};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct FlightKey {
    path: String,
    target_width: u32,
    target_codec: String,
}

#[derive(Debug, Clone, PartialEq)]
enum ProducerState {
    Producing,
    Done,
    Failed(String),
}

/// One in-flight transcode, shared by every subscriber that asked for
/// the same `(path, target_width, target_codec)` (§4.5 single-flight).
/// Bytes accumulate in `buffer` as ffmpeg's stdout is read; a late
/// subscriber starts reading that buffer from offset 0 rather than
/// joining mid-stream.
struct Producer {
    buffer: Mutex<Vec<u8>>,
    notify: Notify,
    state: watch::Sender<ProducerState>,
    child: Mutex<Option<Child>>,
    subscribers: AtomicUsize,
}

impl Producer {
    fn new() -> Self {
        let (state, _) = watch::channel(ProducerState::Producing);
        Self {
            buffer: Mutex::new(Vec::new()),
            notify: Notify::new(),
            state,
            child: Mutex::new(None),
            subscribers: AtomicUsize::new(0),
        }
    }

    fn push(&self, chunk: &[u8]) {
        self.buffer.lock().unwrap().extend_from_slice(chunk);
        self.notify.notify_waiters();
    }

    fn finish(&self, result: std::result::Result<(), String>) {
        let state = match result {
            Ok(()) => ProducerState::Done,
            Err(tail) => ProducerState::Failed(tail),
        };
        let _ = self.state.send(state);
        self.notify.notify_waiters();
    }

    async fn cancel(&self) {
        let child = self.child.lock().unwrap().take();
        if let Some(mut child) = child {
            if let Some(id) = child.id() {
                tracing::debug!(pid = id, "cancelling transcode producer");
            }
            let _ = child.start_kill();
            let _ = tokio::time::timeout(Duration::from_secs(5), child.wait()).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub global_concurrency: usize,
    pub write_timeout: Duration,
    pub cache_sweep_ceiling_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            global_concurrency: 4,
            write_timeout: Duration::from_secs(10),
            cache_sweep_ceiling_bytes: 10 * 1024 * 1024 * 1024,
        }
    }
}

/// Request-driven transcoder (C5): probes sources, streams a passthrough
/// or transcoded byte stream to a sink, and caches the transcoded result.
pub struct Engine {
    media_root: PathBuf,
    cache: TranscodeCache,
    observer: Arc<dyn Observer>,
    config: EngineConfig,
    accel: ferrex_config::Acceleration,
    in_flight: DashMap<FlightKey, Arc<Producer>>,
    concurrency: Arc<Semaphore>,
}

impl Engine {
    pub fn new(
        media_root: PathBuf,
        cache: TranscodeCache,
        observer: Arc<dyn Observer>,
        config: EngineConfig,
        accel: ferrex_config::Acceleration,
    ) -> Self {
        let concurrency = Arc::new(Semaphore::new(config.global_concurrency.max(1)));
        Self {
            media_root,
            cache,
            observer,
            config,
            accel,
            in_flight: DashMap::new(),
            concurrency,
        }
    }

    pub async fn probe_source(&self, path: &str) -> Result<ProbeInfo> {
        let abs = self.media_root.join(path);
        if !abs.exists() {
            return Err(TranscodeError::NotFound(path.to_string()));
        }
        probe(&self.config.ffprobe_path, &abs).await
    }

    /// Writes a stream for `path` at `{target_width, target_codec}` to
    /// `sink`, honoring `cancel`. Serves the source directly when it
    /// already satisfies the target, then checks the cache, then falls
    /// back to a single-flight transcode (§4.5).
    pub async fn stream(
        &self,
        path: &str,
        target_width: u32,
        target_codec: &str,
        source_mtime: i64,
        sink: &mut (impl AsyncWrite + Unpin),
        mut cancel: watch::Receiver<bool>,
    ) -> Result<()> {
        let info = self.probe_source(path).await?;
        let abs = self.media_root.join(path);

        if satisfies_target(&info, target_width, target_codec) {
            return self.stream_file(&abs, sink, &mut cancel).await;
        }

        if let Some(cached) = self.cache.get(path, target_width, target_codec, source_mtime).await {
            self.write_timed(sink, &cached, &mut cancel).await?;
            return Ok(());
        }

        self.stream_transcoded(path, &abs, target_width, target_codec, source_mtime, sink, &mut cancel)
            .await
    }

    /// Cancels every in-flight producer. Each producer's child process is
    /// terminated (then killed after grace) via the same path a detaching
    /// subscriber takes; nothing is written to the cache for a producer
    /// that never reaches `Done`.
    pub async fn shutdown(&self) {
        for entry in self.in_flight.iter() {
            entry.value().cancel().await;
        }
    }

    async fn stream_file(
        &self,
        abs: &std::path::Path,
        sink: &mut (impl AsyncWrite + Unpin),
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let mut file = tokio::fs::File::open(abs)
            .await
            .map_err(|e| TranscodeError::NotFound(e.to_string()))?;
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            if *cancel.borrow() {
                return Err(TranscodeError::Cancelled);
            }
            let n = file.read(&mut buf).await.map_err(|e| TranscodeError::Io(e.to_string()))?;
            if n == 0 {
                return Ok(());
            }
            self.write_timed(sink, &buf[..n], cancel).await?;
        }
    }

    async fn write_timed(
        &self,
        sink: &mut (impl AsyncWrite + Unpin),
        bytes: &[u8],
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        if *cancel.borrow() {
            return Err(TranscodeError::Cancelled);
        }
        tokio::time::timeout(self.config.write_timeout, sink.write_all(bytes))
            .await
            .map_err(|_| TranscodeError::WriteTimeout)?
            .map_err(|e| TranscodeError::Io(e.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    async fn stream_transcoded(
        &self,
        path: &str,
        abs: &std::path::Path,
        target_width: u32,
        target_codec: &str,
        source_mtime: i64,
        sink: &mut (impl AsyncWrite + Unpin),
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let key = FlightKey {
            path: path.to_string(),
            target_width,
            target_codec: target_codec.to_string(),
        };

        let (producer, is_leader) = match self.in_flight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(e) => (e.get().clone(), false),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let producer = Arc::new(Producer::new());
                e.insert(producer.clone());
                (producer, true)
            }
        };

        if is_leader {
            let permit = tokio::select! {
                p = self.concurrency.clone().acquire_owned() => p.map_err(|_| TranscodeError::Cancelled)?,
                _ = cancel.changed() => {
                    self.in_flight.remove(&key);
                    return Err(TranscodeError::Cancelled);
                }
            };
            self.spawn_producer(producer.clone(), abs.to_path_buf(), target_width, target_codec.to_string(), permit);
        }

        producer.subscribers.fetch_add(1, Ordering::SeqCst);
        let result = self.consume(&producer, sink, cancel).await;
        let remaining = producer.subscribers.fetch_sub(1, Ordering::SeqCst) - 1;

        if result.is_ok() {
            let bytes = producer.buffer.lock().unwrap().clone();
            let _ = self.cache.put(path, target_width, target_codec, source_mtime, bytes).await;
        }
        if is_leader {
            self.in_flight.remove(&key);
        }
        if remaining == 0 && matches!(*producer.state.borrow(), ProducerState::Producing) {
            producer.cancel().await;
        }
        result
    }

    fn spawn_producer(
        &self,
        producer: Arc<Producer>,
        abs: PathBuf,
        target_width: u32,
        target_codec: String,
        permit: tokio::sync::OwnedSemaphorePermit,
    ) {
        let ffmpeg_path = self.config.ffmpeg_path.clone();
        let accel = self.accel;
        let observer = self.observer.clone();
        tokio::spawn(async move {
            let _permit = permit;
            observer.transcode_started(&target_codec);
            let start = std::time::Instant::now();

            let mut args = vec!["-y".to_string(), "-i".to_string(), abs.display().to_string()];
            args.extend(hwaccel_args(accel, &target_codec));
            args.extend([
                "-vf".to_string(),
                format!("scale={target_width}:-2"),
                "-f".to_string(),
                "mp4".to_string(),
                "-movflags".to_string(),
                "frag_keyframe+empty_moov".to_string(),
                "pipe:1".to_string(),
            ]);

            let child = tokio::process::Command::new(&ffmpeg_path)
                .args(&args)
                .stdout(std::process::Stdio::piped())
                .stderr(std::process::Stdio::piped())
                .spawn();

            let mut child = match child {
                Ok(c) => c,
                Err(e) => {
                    observer.transcode_failed(&target_codec);
                    producer.finish(Err(e.to_string()));
                    return;
                }
            };

            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            *producer.child.lock().unwrap() = Some(child);

            if let Some(mut out) = stdout {
                pump_stdout(&mut out, &producer).await;
            }

            let Some(mut child) = producer.child.lock().unwrap().take() else {
                // cancelled while pumping stdout; cancel() already killed it.
                return;
            };
            let status = child.wait().await;
            match status {
                Ok(status) if status.success() => {
                    observer.transcode_completed(&target_codec, start.elapsed());
                    producer.finish(Ok(()));
                }
                _ => {
                    let tail = read_stderr_tail(stderr).await;
                    observer.transcode_failed(&target_codec);
                    producer.finish(Err(tail));
                }
            }
        });
    }

    async fn consume(
        &self,
        producer: &Producer,
        sink: &mut (impl AsyncWrite + Unpin),
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let mut offset = 0usize;
        let mut state_rx = producer.state.subscribe();
        loop {
            let chunk = {
                let buf = producer.buffer.lock().unwrap();
                buf[offset..].to_vec()
            };
            if !chunk.is_empty() {
                self.write_timed(sink, &chunk, cancel).await?;
                offset += chunk.len();
                continue;
            }

            match &*state_rx.borrow() {
                ProducerState::Done => return Ok(()),
                ProducerState::Failed(tail) => return Err(TranscodeError::TranscodeFailed(tail.clone())),
                ProducerState::Producing => {}
            }

            tokio::select! {
                _ = producer.notify.notified() => {}
                _ = state_rx.changed() => {}
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        return Err(TranscodeError::Cancelled);
                    }
                }
            }
        }
    }
}

async fn pump_stdout(out: &mut (impl AsyncRead + Unpin), producer: &Producer) {
    let mut buf = [0u8; 64 * 1024];
    loop {
        match out.read(&mut buf).await {
            Ok(0) => return,
            Ok(n) => producer.push(&buf[..n]),
            Err(_) => return,
        }
    }
}

async fn read_stderr_tail(stderr: Option<tokio::process::ChildStderr>) -> String {
    let Some(mut stderr) = stderr else {
        return String::new();
    };
    let mut bytes = Vec::new();
    let _ = stderr.read_to_end(&mut bytes).await;
    let text = String::from_utf8_lossy(&bytes);
    let tail: String = text.lines().rev().take(20).collect::<Vec<_>>().into_iter().rev().collect::<Vec<_>>().join("\n");
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn producer_push_then_finish_is_observed_by_consumer_loop() {
        let producer = Producer::new();
        producer.push(b"hello");
        producer.finish(Ok(()));
        assert_eq!(*producer.buffer.lock().unwrap(), b"hello");
        assert_eq!(*producer.state.borrow(), ProducerState::Done);
    }

    #[tokio::test]
    async fn producer_failure_carries_stderr_tail() {
        let producer = Producer::new();
        producer.finish(Err("boom".to_string()));
        assert_eq!(*producer.state.borrow(), ProducerState::Failed("boom".to_string()));
    }
}
