use std::path::{Path, PathBuf};

use crate::error::{Result, ThumbnailError};

/// Content-addressed thumbnail store under `cache_dir/thumbnails` (§6).
/// Keys are the source catalog path plus the encoding, so a re-encode
/// at a different target edge or format gets its own entry.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    root: PathBuf,
}

impl ThumbnailCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: cache_dir.into().join("thumbnails"),
        }
    }

    fn key(&self, source_path: &str, edge: u32, encoding: &str) -> String {
        format!("{source_path}:{edge}:{encoding}")
    }

    pub async fn put(&self, source_path: &str, edge: u32, encoding: &str, bytes: Vec<u8>) -> Result<String> {
        let key = self.key(source_path, edge, encoding);
        cacache::write(&self.root, &key, bytes)
            .await
            .map_err(|e| ThumbnailError::Cache(e.to_string()))?;
        Ok(key)
    }

    pub async fn get(&self, source_path: &str, edge: u32, encoding: &str) -> Option<Vec<u8>> {
        let key = self.key(source_path, edge, encoding);
        cacache::read(&self.root, &key).await.ok()
    }

    pub async fn metadata(
        &self,
        source_path: &str,
        edge: u32,
        encoding: &str,
    ) -> Option<cacache::Metadata> {
        let key = self.key(source_path, edge, encoding);
        cacache::metadata(&self.root, &key).await.ok().flatten()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThumbnailCache::new(dir.path());
        cache
            .put("a.jpg", 320, "jpeg", b"thumb-bytes".to_vec())
            .await
            .unwrap();
        let bytes = cache.get("a.jpg", 320, "jpeg").await.unwrap();
        assert_eq!(bytes, b"thumb-bytes");
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThumbnailCache::new(dir.path());
        assert!(cache.get("missing.jpg", 320, "jpeg").await.is_none());
    }

    #[tokio::test]
    async fn distinct_edge_or_encoding_is_distinct_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThumbnailCache::new(dir.path());
        cache.put("a.jpg", 320, "jpeg", b"small".to_vec()).await.unwrap();
        cache.put("a.jpg", 640, "jpeg", b"large".to_vec()).await.unwrap();
        assert_eq!(cache.get("a.jpg", 320, "jpeg").await.unwrap(), b"small");
        assert_eq!(cache.get("a.jpg", 640, "jpeg").await.unwrap(), b"large");
    }
}
