use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use ferrex_config::Config;
use ferrex_contracts::Observer;
use ferrex_model::{MemoryPressureLevel, PressureSource};

/// Tri-level pressure signal (§4.6) sampled on a tick from the host's
/// memory usage. Prefers cgroup v2's own (current, max) pair when
/// present, since it reflects container limits the process itself has
/// no other way to see, and falls back to `/proc/self/status` VmRSS
/// against the configured ceiling otherwise.
pub struct MemoryMonitor {
    limit_bytes: u64,
    high_ratio: f64,
    critical_ratio: f64,
    sample_interval: Duration,
    cgroup_current_path: PathBuf,
    cgroup_max_path: PathBuf,
    proc_status_path: PathBuf,
    observer: Arc<dyn Observer>,
    tx: watch::Sender<MemoryPressureLevel>,
}

/// A cheap, cloneable read handle to the monitor's current level.
#[derive(Clone)]
pub struct MemoryHandle {
    rx: watch::Receiver<MemoryPressureLevel>,
}

impl PressureSource for MemoryHandle {
    fn level(&self) -> MemoryPressureLevel {
        *self.rx.borrow()
    }
}

impl MemoryMonitor {
    pub fn new(config: &Config, observer: Arc<dyn Observer>) -> Self {
        Self::with_paths(
            config.memory_limit_bytes,
            config.memory_high_ratio,
            config.memory_critical_ratio,
            Duration::from_secs(5),
            PathBuf::from("/sys/fs/cgroup/memory.current"),
            PathBuf::from("/sys/fs/cgroup/memory.max"),
            PathBuf::from("/proc/self/status"),
            observer,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_paths(
        limit_bytes: u64,
        high_ratio: f64,
        critical_ratio: f64,
        sample_interval: Duration,
        cgroup_current_path: PathBuf,
        cgroup_max_path: PathBuf,
        proc_status_path: PathBuf,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let (tx, _rx) = watch::channel(MemoryPressureLevel::Normal);
        Self {
            limit_bytes,
            high_ratio,
            critical_ratio,
            sample_interval,
            cgroup_current_path,
            cgroup_max_path,
            proc_status_path,
            observer,
            tx,
        }
    }

    pub fn handle(&self) -> MemoryHandle {
        MemoryHandle {
            rx: self.tx.subscribe(),
        }
    }

    /// Drives the sample loop until `shutdown` fires true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.sample_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sample_once().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn sample_once(&self) {
        let (used, limit) = self.sample_usage().await;
        self.observer.memory_gauge(used, limit);
        let level = pressure_from_usage(used, limit, self.high_ratio, self.critical_ratio);
        let changed = *self.tx.borrow() != level;
        self.tx.send_replace(level);
        if changed {
            self.observer.memory_pressure_changed(level.as_str());
        }
    }

    async fn sample_usage(&self) -> (u64, u64) {
        if let Some((current, max)) = self.read_cgroup().await {
            return (current, max);
        }
        let rss = self.read_proc_status_rss().await.unwrap_or(0);
        (rss, self.limit_bytes)
    }

    async fn read_cgroup(&self) -> Option<(u64, u64)> {
        let max_raw = tokio::fs::read_to_string(&self.cgroup_max_path).await.ok()?;
        let max: u64 = max_raw.trim().parse().ok()?;
        let current_raw = tokio::fs::read_to_string(&self.cgroup_current_path).await.ok()?;
        let current: u64 = current_raw.trim().parse().ok()?;
        Some((current, max))
    }

    async fn read_proc_status_rss(&self) -> Option<u64> {
        let contents = tokio::fs::read_to_string(&self.proc_status_path).await.ok()?;
        for line in contents.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                let kb: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
                return Some(kb * 1024);
            }
        }
        None
    }
}

fn pressure_from_usage(used: u64, limit: u64, high_ratio: f64, critical_ratio: f64) -> MemoryPressureLevel {
    if limit == 0 {
        return MemoryPressureLevel::Normal;
    }
    let ratio = used as f64 / limit as f64;
    if ratio >= critical_ratio {
        MemoryPressureLevel::Critical
    } else if ratio >= high_ratio {
        MemoryPressureLevel::High
    } else {
        MemoryPressureLevel::Normal
    }
}
