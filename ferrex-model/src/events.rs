use super::file::MediaKind;
use serde::{Deserialize, Serialize};

/// One file observed by a walker during a scan (§4.3 algorithm step 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedFile {
    pub path: String,
    pub kind: MediaKind,
    pub size: i64,
    pub mtime: i64,
}

/// Published after a full index run completes (§4.3 step 4). Absent on
/// cancellation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl ReconcileResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.added.len(), self.updated.len(), self.removed.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPressureLevel {
    Normal,
    High,
    Critical,
}

impl MemoryPressureLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryPressureLevel::Normal => "normal",
            MemoryPressureLevel::High => "high",
            MemoryPressureLevel::Critical => "critical",
        }
    }
}

/// Non-blocking read of the current memory pressure (§4.6). Implemented
/// by the memory monitor; consumed by worker pools that need to throttle
/// without awaiting anything.
pub trait PressureSource: Send + Sync {
    fn level(&self) -> MemoryPressureLevel;
}

/// A snapshot of indexer progress, polled by the host (ambient addition,
/// SPEC_FULL §4.3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexerStatus {
    pub running: bool,
    pub last_run_at: Option<i64>,
    pub last_result: Option<ReconcileResult>,
}
