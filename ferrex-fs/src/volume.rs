use ferrex_contracts::{VolumeLabel, UNKNOWN_VOLUME};
use std::path::Path;

/// Resolves a path to the volume label of its longest-matching
/// configured mount (§4.1). O(number of mounts) per call, no allocation
/// on the hot path.
#[derive(Debug, Clone, Default)]
pub struct VolumeResolver {
    /// (prefix, label), longest prefix wins. Kept sorted by descending
    /// prefix length so resolution is a single linear scan that returns
    /// on first match.
    mounts: Vec<(String, VolumeLabel)>,
}

impl VolumeResolver {
    pub fn new(mut mounts: Vec<(String, VolumeLabel)>) -> Self {
        mounts.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { mounts }
    }

    pub fn resolve(&self, path: &Path) -> VolumeLabel {
        let path_str = path.to_string_lossy();
        for (prefix, label) in &self.mounts {
            if path_str.starts_with(prefix.as_str()) {
                return label;
            }
        }
        UNKNOWN_VOLUME
    }
}
