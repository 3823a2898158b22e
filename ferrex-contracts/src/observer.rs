use std::fmt;
use std::time::Duration;

/// Metrics/log callback contract published into by every component (§4.8).
///
/// No transport is enforced here; the host wires whatever exporter it
/// wants. A nil observer (see [`NullObserver`]) is a valid configuration
/// and every call on it is a no-op.
pub trait Observer: Send + Sync + fmt::Debug {
    /// Duration of a single filesystem operation, tagged by volume/op.
    fn operation_duration(&self, volume: &str, op: &str, dur: Duration, err: bool) {
        let _ = (volume, op, dur, err);
    }

    /// Duration spent inside the retry loop for one call (including backoff sleeps).
    fn retry_duration(&self, op: &str, volume: &str, dur: Duration) {
        let _ = (op, volume, dur);
    }

    fn retry_attempt(&self, op: &str, volume: &str) {
        let _ = (op, volume);
    }

    fn stale_error(&self, op: &str, volume: &str) {
        let _ = (op, volume);
    }

    fn retry_success(&self, op: &str, volume: &str) {
        let _ = (op, volume);
    }

    fn retry_failure(&self, op: &str, volume: &str) {
        let _ = (op, volume);
    }

    /// Indexer counters for one completed reconcile.
    fn indexer_reconcile(&self, added: usize, updated: usize, removed: usize, dur: Duration) {
        let _ = (added, updated, removed, dur);
    }

    fn indexer_scan_error(&self, volume: &str, op: &str) {
        let _ = (volume, op);
    }

    /// Thumbnail generation outcome for one file.
    fn thumbnail_generated(&self, dur: Duration, cache_hit: bool) {
        let _ = (dur, cache_hit);
    }

    fn thumbnail_failed(&self, kind: &str) {
        let _ = kind;
    }

    /// Transcoder job lifecycle counters.
    fn transcode_started(&self, codec: &str) {
        let _ = codec;
    }

    fn transcode_completed(&self, codec: &str, dur: Duration) {
        let _ = (codec, dur);
    }

    fn transcode_failed(&self, codec: &str) {
        let _ = codec;
    }

    /// Session counters.
    fn session_created(&self) {}
    fn session_expired_swept(&self, count: usize) {
        let _ = count;
    }

    /// Memory gauges.
    fn memory_gauge(&self, used_bytes: u64, limit_bytes: u64) {
        let _ = (used_bytes, limit_bytes);
    }

    fn memory_pressure_changed(&self, level: &str) {
        let _ = level;
    }
}

/// An [`Observer`] that discards everything. The default when no host
/// exporter is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// An [`Observer`] that forwards every call to `tracing`, matching the
/// teacher's pervasive use of structured logging in place of a bespoke
/// metrics pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn operation_duration(&self, volume: &str, op: &str, dur: Duration, err: bool) {
        tracing::debug!(volume, op, ?dur, err, "fs operation");
    }

    fn retry_attempt(&self, op: &str, volume: &str) {
        tracing::warn!(op, volume, "retrying after stale handle");
    }

    fn stale_error(&self, op: &str, volume: &str) {
        tracing::warn!(op, volume, "stale handle detected");
    }

    fn retry_success(&self, op: &str, volume: &str) {
        tracing::info!(op, volume, "retry succeeded");
    }

    fn retry_failure(&self, op: &str, volume: &str) {
        tracing::error!(op, volume, "retry exhausted");
    }

    fn indexer_reconcile(&self, added: usize, updated: usize, removed: usize, dur: Duration) {
        tracing::info!(added, updated, removed, ?dur, "indexer reconcile complete");
    }

    fn indexer_scan_error(&self, volume: &str, op: &str) {
        tracing::warn!(volume, op, "indexer scan error, skipping subtree");
    }

    fn thumbnail_generated(&self, dur: Duration, cache_hit: bool) {
        tracing::debug!(?dur, cache_hit, "thumbnail generated");
    }

    fn thumbnail_failed(&self, kind: &str) {
        tracing::warn!(kind, "thumbnail generation failed");
    }

    fn transcode_started(&self, codec: &str) {
        tracing::info!(codec, "transcode started");
    }

    fn transcode_completed(&self, codec: &str, dur: Duration) {
        tracing::info!(codec, ?dur, "transcode completed");
    }

    fn transcode_failed(&self, codec: &str) {
        tracing::warn!(codec, "transcode failed");
    }

    fn session_created(&self) {
        tracing::debug!("session created");
    }

    fn session_expired_swept(&self, count: usize) {
        if count > 0 {
            tracing::info!(count, "expired sessions swept");
        }
    }

    fn memory_gauge(&self, used_bytes: u64, limit_bytes: u64) {
        tracing::trace!(used_bytes, limit_bytes, "memory gauge");
    }

    fn memory_pressure_changed(&self, level: &str) {
        tracing::warn!(level, "memory pressure changed");
    }
}
