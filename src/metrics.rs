use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing logger activity.
#[derive(Default, Debug)]
pub struct LoggerMetrics {
    records_admitted: AtomicU64,
    records_filtered: AtomicU64,
    dropped_uninitialized: AtomicU64,
    rotations: AtomicU64,
    dumps: AtomicU64,
    io_failures: AtomicU64,
}

impl LoggerMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` records appended to the tree.
    pub fn record_admitted(&self, count: u64) {
        self.records_admitted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a call rejected by the level gate.
    pub fn record_filtered(&self) {
        self.records_filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a call that passed the gate while no tree existed.
    pub fn record_dropped_uninitialized(&self) {
        self.dropped_uninitialized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed rotation cycle.
    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful write of the primary file.
    pub fn record_dump(&self) {
        self.dumps.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed file operation.
    pub fn record_io_failure(&self) {
        self.io_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_admitted: self.records_admitted.load(Ordering::Relaxed),
            records_filtered: self.records_filtered.load(Ordering::Relaxed),
            dropped_uninitialized: self.dropped_uninitialized.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            dumps: self.dumps.load(Ordering::Relaxed),
            io_failures: self.io_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of logger counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Records appended to the tree since construction.
    pub records_admitted: u64,
    /// Calls dropped by the level gate.
    pub records_filtered: u64,
    /// Admitted calls discarded because the logger was not initialized.
    pub dropped_uninitialized: u64,
    /// Rotation cycles performed.
    pub rotations: u64,
    /// Successful writes of the primary file.
    pub dumps: u64,
    /// Failed file writes or deletions.
    pub io_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_admissions_and_rotations() {
        let metrics = LoggerMetrics::new();
        metrics.record_admitted(2);
        metrics.record_admitted(3);
        metrics.record_rotation();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_admitted, 5);
        assert_eq!(snapshot.rotations, 1);
    }

    #[test]
    fn snapshot_is_consistent() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.snapshot().records_admitted, 0);
        assert_eq!(metrics.snapshot().io_failures, 0);
    }
}
