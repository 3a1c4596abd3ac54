//! Rotation bookkeeping: record counting, rotated file naming and the bounded history.
//!
//! The state here is pure; the logger performs the actual file I/O after consulting it.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Default number of admitted records after which the tree is rotated.
pub const DEFAULT_MAX_RECORDS: u64 = 500;
/// Default number of rotated files kept on disk.
pub const DEFAULT_RETAINED_FILES: usize = 5;

/// Counter and bounded FIFO of rotated files.
#[derive(Debug)]
pub struct RotationState {
    max_records: u64,
    capacity: usize,
    pending: u64,
    retained: VecDeque<PathBuf>,
}

impl RotationState {
    /// Build a state rotating after `max_records` and keeping at most `capacity` files.
    pub fn new(max_records: u64, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            max_records: max_records.max(1),
            capacity,
            pending: 0,
            retained: VecDeque::with_capacity(capacity),
        }
    }

    /// Count `appended` records. Returns `true` when the total strictly exceeds the maximum,
    /// in which case the counter is reset so that exactly one caller triggers the rotation.
    pub fn record_appended(&mut self, appended: u64) -> bool {
        self.pending = self.pending.saturating_add(appended);
        if self.pending > self.max_records {
            self.pending = 0;
            return true;
        }
        false
    }

    /// Records counted since the last rotation.
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Configured maximum.
    pub fn max_records(&self) -> u64 {
        self.max_records
    }

    /// Maximum number of retained files.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rotated files still on record, oldest first.
    pub fn retained(&self) -> impl Iterator<Item = &Path> {
        self.retained.iter().map(PathBuf::as_path)
    }

    /// Update the limits in place; the history shrinks from the front if needed.
    ///
    /// Returns the files dropped from the history so the caller can delete them.
    pub fn reconfigure(&mut self, max_records: u64, capacity: usize) -> Vec<PathBuf> {
        self.max_records = max_records.max(1);
        self.capacity = capacity.max(1);
        let excess = self.retained.len().saturating_sub(self.capacity);
        self.retained.drain(..excess).collect()
    }

    /// File the next [`evict_oldest`](Self::evict_oldest) call would pop, if the history is full.
    pub fn next_eviction(&self) -> Option<&Path> {
        if self.retained.len() >= self.capacity {
            self.retained.front().map(PathBuf::as_path)
        } else {
            None
        }
    }

    /// Pop the oldest retained file when the history is full.
    ///
    /// Call once the file returned by [`next_eviction`](Self::next_eviction) is gone from disk.
    pub fn evict_oldest(&mut self) -> Option<PathBuf> {
        if self.retained.len() >= self.capacity {
            self.retained.pop_front()
        } else {
            None
        }
    }

    /// Record a rotated file that has been written and restart the counter.
    ///
    /// Returns the oldest file if the history had to make room for it.
    pub fn retain(&mut self, target: PathBuf) -> Option<PathBuf> {
        self.pending = 0;
        let overflow = self.evict_oldest();
        self.retained.push_back(target);
        overflow
    }

    /// Forget all counters and history.
    pub fn reset(&mut self) {
        self.pending = 0;
        self.retained.clear();
    }
}

/// Name of the rotated file: `{hour}_{minute}_{second}_{nanos}_{file name}` next to `primary`.
pub fn rotated_file_name(primary: &Path, now: OffsetDateTime) -> PathBuf {
    let base = primary
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!(
        "{}_{}_{}_{}_{}",
        now.hour(),
        now.minute(),
        now.second(),
        now.nanosecond(),
        base
    );
    match primary.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn record_appended_triggers_only_past_maximum() {
        let mut state = RotationState::new(3, 5);
        assert!(!state.record_appended(1));
        assert!(!state.record_appended(1));
        assert!(!state.record_appended(1));
        assert_eq!(state.pending(), 3);
        assert!(state.record_appended(1));
        assert_eq!(state.pending(), 0);
    }

    #[test]
    fn rotated_name_prefixes_time_fields() {
        let now = datetime!(2025-08-26 07:04:09.000123456 UTC);
        assert_eq!(
            rotated_file_name(Path::new("log.json"), now),
            PathBuf::from("7_4_9_123456_log.json")
        );
        assert_eq!(
            rotated_file_name(Path::new("out/log.json"), now),
            PathBuf::from("out/7_4_9_123456_log.json")
        );
    }

    fn target(start: OffsetDateTime, seconds: i64) -> PathBuf {
        rotated_file_name(Path::new("log.json"), start + time::Duration::seconds(seconds))
    }

    #[test]
    fn eviction_makes_room_once_full() {
        let mut state = RotationState::new(10, 2);
        let start = datetime!(2025-01-01 00:00:00 UTC);
        let (first, second, third) = (target(start, 0), target(start, 1), target(start, 2));

        assert_eq!(state.retain(first.clone()), None);
        assert_eq!(state.next_eviction(), None);
        assert_eq!(state.retain(second.clone()), None);
        assert_eq!(state.next_eviction(), Some(first.as_path()));

        assert_eq!(state.evict_oldest(), Some(first));
        assert_eq!(state.evict_oldest(), None);
        assert_eq!(state.retain(third.clone()), None);

        let retained: Vec<&Path> = state.retained().collect();
        assert_eq!(retained, vec![second.as_path(), third.as_path()]);
    }

    #[test]
    fn retain_resets_pending_and_reports_overflow() {
        let mut state = RotationState::new(10, 1);
        let start = datetime!(2025-01-01 00:00:00 UTC);
        state.record_appended(4);
        assert_eq!(state.retain(target(start, 0)), None);
        assert_eq!(state.pending(), 0);
        assert_eq!(state.retain(target(start, 1)), Some(target(start, 0)));
        assert_eq!(state.retained().count(), 1);
    }

    #[test]
    fn reconfigure_shrinks_history_from_front() {
        let mut state = RotationState::new(10, 3);
        let start = datetime!(2025-01-01 00:00:00 UTC);
        let targets: Vec<PathBuf> = (0..3).map(|i| target(start, i)).collect();
        for path in &targets {
            state.retain(path.clone());
        }

        let dropped = state.reconfigure(10, 1);
        assert_eq!(dropped, targets[..2].to_vec());
        assert_eq!(state.retained().count(), 1);
    }

    #[test]
    fn zero_limits_are_clamped() {
        let state = RotationState::new(0, 0);
        assert_eq!(state.max_records(), 1);
        assert_eq!(state.capacity(), 1);
    }
}
