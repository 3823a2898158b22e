use std::path::{Path, PathBuf};

use crate::error::{Result, TranscodeError};

/// Content-addressed transcode store under `cache_dir/transcodes`,
/// partitioned from `ferrex-thumbnails`' `thumbnails/` partition so the
/// two engines never write to each other's keys (§5).
#[derive(Debug, Clone)]
pub struct TranscodeCache {
    root: PathBuf,
}

impl TranscodeCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: cache_dir.into().join("transcodes"),
        }
    }

    fn key(&self, source_path: &str, target_width: u32, target_codec: &str, source_mtime: i64) -> String {
        format!("{source_path}:{source_mtime}:{target_width}:{target_codec}")
    }

    pub async fn put(
        &self,
        source_path: &str,
        target_width: u32,
        target_codec: &str,
        source_mtime: i64,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let key = self.key(source_path, target_width, target_codec, source_mtime);
        cacache::write(&self.root, &key, bytes)
            .await
            .map_err(|e| TranscodeError::Cache(e.to_string()))?;
        Ok(key)
    }

    pub async fn get(
        &self,
        source_path: &str,
        target_width: u32,
        target_codec: &str,
        source_mtime: i64,
    ) -> Option<Vec<u8>> {
        let key = self.key(source_path, target_width, target_codec, source_mtime);
        cacache::read(&self.root, &key).await.ok()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Total bytes currently held in the cache (`CacheSize`, §4.5).
    pub fn size_bytes(&self) -> u64 {
        let mut total = 0u64;
        for entry in cacache::index::ls(&self.root) {
            if let Ok(meta) = entry {
                total = total.saturating_add(meta.size as u64);
            }
        }
        total
    }

    /// Evicts the oldest entries (by write time, as a proxy for atime)
    /// until at least `bytes_to_evict` have been freed (`SweepCache`, §4.5).
    pub fn sweep(&self, bytes_to_evict: u64) -> u64 {
        let mut candidates: Vec<cacache::Metadata> = cacache::index::ls(&self.root).filter_map(Result::ok).collect();
        candidates.sort_by_key(|m| m.time);

        let remover = cacache::index::RemoveOpts::new().remove_fully(true);
        let mut freed = 0u64;
        for entry in candidates {
            if freed >= bytes_to_evict {
                break;
            }
            if remover.clone().remove_sync(&self.root, &entry.key).is_ok() {
                freed = freed.saturating_add(entry.size as u64);
            }
        }
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranscodeCache::new(dir.path());
        cache
            .put("movie.mp4", 1280, "h264", 100, b"transcoded-bytes".to_vec())
            .await
            .unwrap();
        let bytes = cache.get("movie.mp4", 1280, "h264", 100).await.unwrap();
        assert_eq!(bytes, b"transcoded-bytes");
    }

    #[tokio::test]
    async fn stale_mtime_misses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranscodeCache::new(dir.path());
        cache
            .put("movie.mp4", 1280, "h264", 100, b"v1".to_vec())
            .await
            .unwrap();
        assert!(cache.get("movie.mp4", 1280, "h264", 200).await.is_none());
    }

    #[tokio::test]
    async fn size_bytes_reflects_written_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranscodeCache::new(dir.path());
        cache.put("a.mp4", 640, "h264", 1, vec![0u8; 10]).await.unwrap();
        cache.put("b.mp4", 640, "h264", 1, vec![0u8; 20]).await.unwrap();
        assert_eq!(cache.size_bytes(), 30);
    }

    #[tokio::test]
    async fn sweep_evicts_oldest_first_until_target_freed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranscodeCache::new(dir.path());
        cache.put("a.mp4", 640, "h264", 1, vec![0u8; 10]).await.unwrap();
        cache.put("b.mp4", 640, "h264", 1, vec![0u8; 10]).await.unwrap();
        cache.put("c.mp4", 640, "h264", 1, vec![0u8; 10]).await.unwrap();

        let freed = cache.sweep(15);
        assert!(freed >= 15);
        assert!(cache.size_bytes() <= 30 - 15);
    }
}
