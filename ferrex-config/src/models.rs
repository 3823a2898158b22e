use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The enumerated set of recognized options (§6). Anything not named
/// here is not a supported knob, so the catalog core never grows an
/// implicit config surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media_root: PathBuf,
    pub cache_dir: PathBuf,
    pub database_dir: PathBuf,

    pub index_full_interval_secs: u64,
    pub index_poll_interval_secs: u64,
    pub index_workers: usize,

    pub thumb_sweep_interval_secs: u64,
    pub thumb_workers: usize,
    pub thumb_target_edge: u32,
    pub thumb_encoding: ThumbnailEncoding,

    pub transcode_global_concurrency: usize,
    pub transcode_cache_max_bytes: u64,
    pub transcode_acceleration: Acceleration,

    pub session_window_secs: i64,
    pub session_cleanup_interval_secs: u64,
    pub session_extend_threshold: f64,

    pub memory_limit_bytes: u64,
    pub memory_high_ratio: f64,
    pub memory_critical_ratio: f64,

    pub slow_query_threshold_ms: u64,
    pub volume_map: Vec<VolumeMapEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailEncoding {
    Png,
    Jpeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceleration {
    Auto,
    Nvidia,
    Vaapi,
    Videotoolbox,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMapEntry {
    pub prefix: PathBuf,
    pub label: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            media_root: PathBuf::from("/media"),
            cache_dir: PathBuf::from("/var/lib/ferrex/cache"),
            database_dir: PathBuf::from("/var/lib/ferrex/db"),

            index_full_interval_secs: 30 * 60,
            index_poll_interval_secs: 30,
            index_workers: 3,

            thumb_sweep_interval_secs: 6 * 60 * 60,
            thumb_workers: default_thumb_workers(),
            thumb_target_edge: 320,
            thumb_encoding: ThumbnailEncoding::Jpeg,

            transcode_global_concurrency: 4,
            transcode_cache_max_bytes: 10 * 1024 * 1024 * 1024,
            transcode_acceleration: Acceleration::Auto,

            session_window_secs: 24 * 60 * 60,
            session_cleanup_interval_secs: 60 * 60,
            session_extend_threshold: 0.10,

            memory_limit_bytes: 2 * 1024 * 1024 * 1024,
            memory_high_ratio: 0.75,
            memory_critical_ratio: 0.90,

            slow_query_threshold_ms: 200,
            volume_map: Vec::new(),
        }
    }
}

fn default_thumb_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    ((cpus as f64 * 1.5) as usize).clamp(1, 6)
}
