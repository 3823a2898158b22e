use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use ferrex_contracts::Observer;

use crate::error::{FsError, Result};
use crate::retry::RetryConfig;
use crate::volume::VolumeResolver;

#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub is_dir: bool,
    pub is_file: bool,
    pub len: u64,
    pub modified_unix: i64,
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// `Stat`/`Open`/`ReadDir`/`WriteFile` (§4.1). Kept as a trait (rather
/// than free functions) so C3/C4/C5 can be exercised against an
/// in-memory filesystem in tests.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn stat(&self, path: &Path) -> Result<FileStat>;
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()>;
}

/// Real filesystem backed by `tokio::fs`, with ESTALE retry, volume
/// tagging, and observer hooks wrapped around every call.
pub struct ResilientFs {
    retry: RetryConfig,
    volumes: VolumeResolver,
    observer: Arc<dyn Observer>,
}

impl ResilientFs {
    pub fn new(retry: RetryConfig, volumes: VolumeResolver, observer: Arc<dyn Observer>) -> Self {
        Self {
            retry,
            volumes,
            observer,
        }
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, path: &Path, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, std::io::Error>>,
    {
        let volume = self.volumes.resolve(path);
        let call_start = Instant::now();
        let mut attempt = 0u32;
        let mut last_err;

        loop {
            match f().await {
                Ok(value) => {
                    self.observer
                        .operation_duration(volume, op, call_start.elapsed(), false);
                    if attempt > 0 {
                        self.observer.retry_success(op, volume);
                    }
                    return Ok(value);
                }
                Err(io_err) => {
                    let classified = FsError::from_io(path, io_err);
                    last_err = classified;
                }
            }

            let retryable = matches!(last_err, FsError::Stale(_));
            if !retryable || attempt >= self.retry.max_retries {
                self.observer
                    .operation_duration(volume, op, call_start.elapsed(), true);
                if retryable {
                    self.observer.retry_failure(op, volume);
                }
                return Err(last_err);
            }

            self.observer.stale_error(op, volume);
            self.observer.retry_attempt(op, volume);
            let retry_start = Instant::now();
            tokio::time::sleep(self.retry.backoff_for(attempt)).await;
            self.observer
                .retry_duration(op, volume, retry_start.elapsed());
            attempt += 1;
        }
    }
}

#[async_trait]
impl FileSystem for ResilientFs {
    async fn stat(&self, path: &Path) -> Result<FileStat> {
        self.with_retry("stat", path, || async move {
            let md = tokio::fs::metadata(path).await?;
            let modified_unix = md
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            Ok(FileStat {
                is_dir: md.is_dir(),
                is_file: md.is_file(),
                len: md.len(),
                modified_unix,
            })
        })
        .await
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        self.with_retry("read_dir", path, || async move {
            let mut rd = tokio::fs::read_dir(path).await?;
            let mut out = Vec::new();
            while let Some(entry) = rd.next_entry().await? {
                let file_type = entry.file_type().await?;
                out.push(DirEntry {
                    path: entry.path(),
                    is_dir: file_type.is_dir(),
                });
            }
            Ok(out)
        })
        .await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.with_retry("read", path, || async move { tokio::fs::read(path).await })
            .await
    }

    async fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.with_retry("write_file", path, || async move {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, bytes).await
        })
        .await
    }
}

/// In-memory filesystem for C3/C4/C5 tests: deterministic, no real I/O,
/// and able to simulate a fixed number of transient stale-handle
/// failures per path.
#[derive(Default)]
pub struct InMemoryFs {
    inner: std::sync::Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    dirs: HashMap<PathBuf, Vec<DirEntry>>,
    files: HashMap<PathBuf, (Vec<u8>, i64)>,
    stale_until: HashMap<PathBuf, u32>,
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl Into<PathBuf>, entries: Vec<DirEntry>) {
        self.inner
            .lock()
            .unwrap()
            .dirs
            .insert(path.into(), entries);
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, bytes: Vec<u8>, modified_unix: i64) {
        self.inner
            .lock()
            .unwrap()
            .files
            .insert(path.into(), (bytes, modified_unix));
    }

    /// The next `count` calls touching `path` fail with a stale-handle
    /// error before succeeding.
    pub fn fail_stale_times(&self, path: impl Into<PathBuf>, count: u32) {
        self.inner
            .lock()
            .unwrap()
            .stale_until
            .insert(path.into(), count);
    }

    fn maybe_stale(&self, path: &Path) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        if let Some(remaining) = guard.stale_until.get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FsError::Stale(format!("{}: simulated ESTALE", path.display())));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn stat(&self, path: &Path) -> Result<FileStat> {
        self.maybe_stale(path)?;
        let guard = self.inner.lock().unwrap();
        if guard.dirs.contains_key(path) {
            return Ok(FileStat {
                is_dir: true,
                is_file: false,
                len: 0,
                modified_unix: 0,
            });
        }
        if let Some((bytes, modified)) = guard.files.get(path) {
            return Ok(FileStat {
                is_dir: false,
                is_file: true,
                len: bytes.len() as u64,
                modified_unix: *modified,
            });
        }
        Err(FsError::NotFound(path.display().to_string()))
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        self.maybe_stale(path)?;
        let guard = self.inner.lock().unwrap();
        guard
            .dirs
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.display().to_string()))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.maybe_stale(path)?;
        let guard = self.inner.lock().unwrap();
        guard
            .files
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| FsError::NotFound(path.display().to_string()))
    }

    async fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.maybe_stale(path)?;
        let modified = ferrex_model_now();
        self.inner
            .lock()
            .unwrap()
            .files
            .insert(path.to_path_buf(), (bytes.to_vec(), modified));
        Ok(())
    }
}

fn ferrex_model_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct RecordingObserver {
        retry_successes: AtomicUsize,
        retry_failures: AtomicUsize,
        retry_attempts: AtomicUsize,
    }

    impl Observer for RecordingObserver {
        fn retry_success(&self, _op: &str, _volume: &str) {
            self.retry_successes.fetch_add(1, Ordering::SeqCst);
        }
        fn retry_failure(&self, _op: &str, _volume: &str) {
            self.retry_failures.fetch_add(1, Ordering::SeqCst);
        }
        fn retry_attempt(&self, _op: &str, _volume: &str) {
            self.retry_attempts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_retry_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_backoff: std::time::Duration::from_millis(1),
            max_backoff: std::time::Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn stale_then_success_retries_and_reports_once() {
        let observer = Arc::new(RecordingObserver::default());
        let fs = ResilientFs::new(
            test_retry_config(),
            VolumeResolver::default(),
            observer.clone(),
        );

        let remaining = AtomicU32::new(2);
        let result = fs
            .with_retry("stat", Path::new("/tmp/x"), || {
                let remaining = &remaining;
                async move {
                    if remaining.load(Ordering::SeqCst) > 0 {
                        remaining.fetch_sub(1, Ordering::SeqCst);
                        Err(std::io::Error::from_raw_os_error(116))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(observer.retry_successes.load(Ordering::SeqCst), 1);
        assert_eq!(observer.retry_attempts.load(Ordering::SeqCst), 2);
        assert_eq!(observer.retry_failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_stale_errors_are_not_retried() {
        let observer = Arc::new(RecordingObserver::default());
        let fs = ResilientFs::new(
            test_retry_config(),
            VolumeResolver::default(),
            observer.clone(),
        );

        let calls = AtomicU32::new(0);
        let result: Result<()> = fs
            .with_retry("stat", Path::new("/tmp/missing"), || {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(std::io::Error::from(std::io::ErrorKind::NotFound))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observer.retry_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_retries_report_failure() {
        let observer = Arc::new(RecordingObserver::default());
        let fs = ResilientFs::new(
            test_retry_config(),
            VolumeResolver::default(),
            observer.clone(),
        );

        let result: Result<()> = fs
            .with_retry("stat", Path::new("/tmp/always-stale"), || async move {
                Err(std::io::Error::from_raw_os_error(116))
            })
            .await;

        assert!(matches!(result, Err(FsError::Stale(_))));
        assert_eq!(observer.retry_failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn real_fs_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let fs = ResilientFs::new(
            RetryConfig::default(),
            VolumeResolver::default(),
            Arc::new(RecordingObserver::default()),
        );
        fs.write_file(&path, b"hello").await.unwrap();
        let stat = fs.stat(&path).await.unwrap();
        assert!(stat.is_file);
        assert_eq!(stat.len, 5);
        let bytes = fs.read(&path).await.unwrap();
        assert_eq!(bytes, b"hello");
    }
}
