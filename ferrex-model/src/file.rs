use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of media a path was classified as during indexing (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Playlist,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Playlist => "playlist",
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "playlist" => Ok(MediaKind::Playlist),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

/// A file known to the catalog, identified by its canonical relative
/// `path` (§3, invariant 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    pub kind: MediaKind,
    pub size_bytes: i64,
    pub modified_at: i64,
    pub indexed_at: i64,
}

/// Attributes supplied by the indexer on upsert; everything else
/// (`path`, timestamps) is derived by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttrs {
    pub name: String,
    pub kind: MediaKind,
    pub size_bytes: i64,
    pub modified_at: i64,
}

/// Validates that `path` is canonical per §3 invariant 1: forward
/// slashes, no `.` / `..` components, not absolute, non-empty.
pub fn validate_canonical_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path must not be empty".to_string());
    }
    if path.contains('\\') {
        return Err("path must use forward slashes".to_string());
    }
    if path.starts_with('/') {
        return Err("path must be relative to the media root".to_string());
    }
    for component in path.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(format!("path escapes or is malformed: {path}"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct LibraryStats {
    pub images: u64,
    pub videos: u64,
    pub playlists: u64,
    pub folders: u64,
}

pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}
