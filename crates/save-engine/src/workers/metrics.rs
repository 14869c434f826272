//! Write pipeline metrics and statistics.
//!
//! Tracks flush frequency and writer outcomes for monitoring and for
//! asserting the throttling contract in tests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by the persistence engine.
///
/// Uses atomics for lock-free access across tasks.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Dirty records serialized and enqueued for write.
    flushes: AtomicU64,

    /// Save requests durably written.
    completed_writes: AtomicU64,

    /// Individual write attempts that failed.
    failed_write_attempts: AtomicU64,

    /// Failed requests re-enqueued for another attempt.
    retries: AtomicU64,

    /// Requests abandoned after exhausting their attempts.
    dropped_writes: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed_write(&self) {
        self.completed_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_attempt(&self) {
        self.failed_write_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_write(&self) {
        self.dropped_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn completed_writes(&self) -> u64 {
        self.completed_writes.load(Ordering::Relaxed)
    }

    pub fn failed_write_attempts(&self) -> u64 {
        self.failed_write_attempts.load(Ordering::Relaxed)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes.load(Ordering::Relaxed)
    }

    /// Snapshot of all counters for display/logging.
    ///
    /// Individual fields are read atomically but the snapshot as a
    /// whole may be inconsistent while the writer is active.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            flushes: self.flushes(),
            completed_writes: self.completed_writes(),
            failed_write_attempts: self.failed_write_attempts(),
            retries: self.retries(),
            dropped_writes: self.dropped_writes(),
        }
    }
}

/// Point-in-time view of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub flushes: u64,
    pub completed_writes: u64,
    pub failed_write_attempts: u64,
    pub retries: u64,
    pub dropped_writes: u64,
}
