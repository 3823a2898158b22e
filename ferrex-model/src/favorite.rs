use super::file::MediaKind;
use serde::{Deserialize, Serialize};

/// A favorited path. Independent of `FileEntry` existence (§3) so a
/// missing source file does not evict user intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub path: String,
    pub name: String,
    pub kind: MediaKind,
    pub added_at: i64,
}
