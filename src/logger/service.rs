//! Tree logger service coordinating the level gate, path tree, serializer and rotation.

use crate::{
    config::{IoFailurePolicy, LoggerConfig},
    level::{Level, LevelFilter, LevelGate},
    logger::types::LoggerError,
    metrics::{LoggerMetrics, MetricsSnapshot},
    record::{Clock, DEFAULT_MAX_MESSAGE_LEN, Location, Record, SystemClock},
    rotation::{self, DEFAULT_MAX_RECORDS, DEFAULT_RETAINED_FILES, RotationState},
    serialize,
    template::{self, Step},
    tree::{PathError, PathTree},
};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Settings and bookkeeping guarded by the state lock.
struct LoggerState {
    gate: LevelGate,
    file_path: Option<PathBuf>,
    rotation: RotationState,
    max_message_len: usize,
    io_failure_policy: IoFailurePolicy,
}

impl Default for LoggerState {
    fn default() -> Self {
        Self {
            gate: LevelGate::default(),
            file_path: None,
            rotation: RotationState::new(DEFAULT_MAX_RECORDS, DEFAULT_RETAINED_FILES),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            io_failure_policy: IoFailurePolicy::default(),
        }
    }
}

enum Append {
    Done(u64),
    Uninitialized,
    Rejected(PathError),
}

/// Concurrent hierarchical log aggregator.
///
/// Records are appended to an in-memory [`PathTree`] addressed by path segments and written
/// out as JSON on [`dump`](Self::dump). Once more than the configured number of records has
/// been appended since the last rotation, the tree is moved to a timestamped side file and
/// replaced by an empty one; at most `retained_files` side files are kept.
///
/// Locking:
/// - `tree` guards the node arena and is never held during file I/O.
/// - `state` guards the threshold, file path and rotation bookkeeping.
/// - `lifecycle` serialises initialization, teardown and rotation cycles. It is always taken
///   first; `log` never holds `tree` while taking `state`.
/// - `file_io` serialises writes to disk. Dumps hold it while rendering, so a stale snapshot
///   can never overwrite the final flush written by `destroy`. Taken before `tree`.
///
/// Construct one per application and share it by reference or `Arc`, or use
/// [`global`](crate::logger::global) for an ambient instance.
pub struct TreeLogger {
    tree: Mutex<Option<PathTree>>,
    state: Mutex<LoggerState>,
    lifecycle: Mutex<()>,
    file_io: Mutex<()>,
    clock: Arc<dyn Clock>,
    metrics: LoggerMetrics,
}

impl Default for TreeLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn segments<S: AsRef<str>>(path: &[S]) -> Vec<&str> {
    path.iter().map(|segment| segment.as_ref()).collect()
}

/// Callers hold the `file_io` lock.
fn write(path: &Path, contents: &str) -> Result<(), LoggerError> {
    serialize::write_file(path, contents).map_err(|source| LoggerError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_rotated(path: &Path) -> Result<(), LoggerError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(file = %path.display(), "Evicted rotated file already gone");
            Ok(())
        }
        Err(source) => Err(LoggerError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl TreeLogger {
    /// Create an uninitialized logger using the system clock.
    ///
    /// Every record is dropped until [`initialize`](Self::initialize) runs, because the default
    /// threshold admits nothing and there is no tree to append to.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an uninitialized logger stamping records with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tree: Mutex::new(None),
            state: Mutex::new(LoggerState::default()),
            lifecycle: Mutex::new(()),
            file_io: Mutex::new(()),
            clock,
            metrics: LoggerMetrics::new(),
        }
    }

    /// Set the threshold and primary file, keeping every other setting.
    ///
    /// Calling this again while initialized swaps the file path and threshold in place;
    /// records already in the tree are kept.
    pub fn initialize(&self, level: Level, file_path: impl AsRef<Path>) -> Result<(), LoggerError> {
        let config = {
            let state = lock(&self.state);
            LoggerConfig {
                file_path: file_path.as_ref().to_path_buf(),
                level,
                max_records: state.rotation.max_records(),
                retained_files: state.rotation.capacity(),
                max_message_len: state.max_message_len,
                io_failure_policy: state.io_failure_policy,
            }
        };
        self.initialize_with(config)
    }

    /// Apply a full configuration, creating the tree if needed.
    ///
    /// Fails without touching any state when the primary file cannot be opened for writing.
    pub fn initialize_with(&self, config: LoggerConfig) -> Result<(), LoggerError> {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file_path)
            .map_err(|source| LoggerError::Open {
                path: config.file_path.clone(),
                source,
            })?;

        let _lifecycle = lock(&self.lifecycle);
        let created = {
            let mut tree = lock(&self.tree);
            if tree.is_none() {
                *tree = Some(PathTree::new());
                true
            } else {
                false
            }
        };

        let dropped = {
            let mut state = lock(&self.state);
            state.gate.set_threshold(config.level);
            state.file_path = Some(config.file_path.clone());
            state.max_message_len = config.max_message_len.max(1);
            state.io_failure_policy = config.io_failure_policy;
            state
                .rotation
                .reconfigure(config.max_records, config.retained_files)
        };
        for path in dropped {
            if let Err(err) = remove_rotated(&path) {
                self.report(err);
            }
        }

        tracing::debug!(
            file = %config.file_path.display(),
            level = %config.level,
            max_records = config.max_records,
            retained_files = config.retained_files,
            fresh = created,
            "Tree logger initialized"
        );
        Ok(())
    }

    /// Whether a tree currently exists.
    pub fn is_initialized(&self) -> bool {
        lock(&self.tree).is_some()
    }

    /// Current threshold.
    pub fn level(&self) -> LevelFilter {
        lock(&self.state).gate.threshold()
    }

    /// Replace the threshold.
    pub fn set_level(&self, level: Level) {
        lock(&self.state).gate.set_threshold(level);
    }

    /// Replace the threshold from a raw level code; sentinels and unknown codes are ignored.
    pub fn set_level_code(&self, code: u8) {
        if !lock(&self.state).gate.set_threshold_code(code) {
            tracing::debug!(code, "Ignored invalid level code");
        }
    }

    /// Whether a record at `level` would pass the threshold.
    pub fn enabled(&self, level: Level) -> bool {
        lock(&self.state).gate.admit(level)
    }

    /// Primary file, if initialized.
    pub fn file_path(&self) -> Option<PathBuf> {
        lock(&self.state).file_path.clone()
    }

    /// Records counted since the last rotation.
    pub fn pending_records(&self) -> u64 {
        lock(&self.state).rotation.pending()
    }

    /// Rotated files currently kept, oldest first.
    pub fn retained_files(&self) -> Vec<PathBuf> {
        lock(&self.state)
            .rotation
            .retained()
            .map(Path::to_path_buf)
            .collect()
    }

    /// Records held by the live tree.
    pub fn record_count(&self) -> usize {
        lock(&self.tree)
            .as_ref()
            .map_or(0, PathTree::record_count)
    }

    /// Rendered JSON of the live tree, without writing it anywhere.
    pub fn snapshot(&self) -> Option<String> {
        lock(&self.tree).as_ref().map(serialize::render)
    }

    /// Activity counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Append `message` under `path`.
    pub fn log<S: AsRef<str>>(&self, path: &[S], level: Level, message: &str) {
        self.log_at(path, level, None, message);
    }

    /// Append `message` under `path`, tagged with a source location.
    ///
    /// Filtered levels, empty paths and paths using the reserved `logs` segment leave the tree
    /// untouched.
    pub fn log_at<S: AsRef<str>>(
        &self,
        path: &[S],
        level: Level,
        location: Option<&Location>,
        message: &str,
    ) {
        let Some(max_len) = self.admit(level) else {
            return;
        };
        let record = Record::new(self.clock.as_ref(), level, location, message, max_len);

        let outcome = {
            let mut guard = lock(&self.tree);
            match guard.as_mut() {
                None => Append::Uninitialized,
                Some(tree) => match tree.resolve_path(path) {
                    Ok(node) => {
                        tree.append_record(node, record);
                        Append::Done(1)
                    }
                    Err(err) => Append::Rejected(err),
                },
            }
        };

        if let Append::Rejected(err) = &outcome {
            tracing::warn!(path = ?segments(path), error = %err, "Rejected log path");
        }
        self.finish_append(outcome, level);
    }

    /// Expand a template with embedded descent directives and append the resulting records.
    ///
    /// See [`crate::template`] for the directive syntax. The cursor starts at the root, so text
    /// preceding the first descent is recorded under the root's own `logs`.
    pub fn log_template(&self, level: Level, template: &str, args: &[&dyn fmt::Display]) {
        self.log_template_at(level, None, template, args);
    }

    /// [`log_template`](Self::log_template) with a source location on every emitted record.
    pub fn log_template_at(
        &self,
        level: Level,
        location: Option<&Location>,
        template: &str,
        args: &[&dyn fmt::Display],
    ) {
        let Some(max_len) = self.admit(level) else {
            return;
        };

        let steps = template::expand(template, args);
        let invalid = steps.iter().find_map(|step| match step {
            Step::Descend(name) => PathTree::validate_segment(name).err(),
            Step::Emit(_) => None,
        });
        if let Some(err) = invalid {
            tracing::warn!(template, error = %err, "Rejected log template");
            return;
        }

        let outcome = {
            let mut guard = lock(&self.tree);
            match guard.as_mut() {
                None => Append::Uninitialized,
                Some(tree) => {
                    let mut cursor = tree.root();
                    let mut appended = 0;
                    for step in &steps {
                        match step {
                            Step::Descend(name) => cursor = tree.ensure_child(cursor, name),
                            Step::Emit(message) => {
                                let record = Record::new(
                                    self.clock.as_ref(),
                                    level,
                                    location,
                                    message,
                                    max_len,
                                );
                                tree.append_record(cursor, record);
                                appended += 1;
                            }
                        }
                    }
                    Append::Done(appended)
                }
            }
        };
        self.finish_append(outcome, level);
    }

    /// Write the live tree to the primary file, overwriting it. The tree is kept.
    pub fn dump(&self) {
        if let Err(err) = self.try_dump() {
            self.report(err);
        }
    }

    /// [`dump`](Self::dump), returning the written path or the failure.
    pub fn try_dump(&self) -> Result<PathBuf, LoggerError> {
        let _io = lock(&self.file_io);
        let rendered = lock(&self.tree)
            .as_ref()
            .map(serialize::render)
            .ok_or(LoggerError::Uninitialized)?;
        let path = lock(&self.state)
            .file_path
            .clone()
            .ok_or(LoggerError::Uninitialized)?;

        write(&path, &rendered)?;
        self.metrics.record_dump();
        Ok(path)
    }

    /// Force a rotation cycle.
    pub fn rotate(&self) {
        if let Err(err) = self.try_rotate() {
            self.report(err);
        }
    }

    /// [`rotate`](Self::rotate), returning the rotated file or the failure.
    ///
    /// If the oldest retained file cannot be deleted the cycle stops before the tree is
    /// touched. If the rotated file cannot be written, the detached records are merged back
    /// into the live tree and the history does not gain the missing file.
    pub fn try_rotate(&self) -> Result<PathBuf, LoggerError> {
        let _lifecycle = lock(&self.lifecycle);
        if lock(&self.tree).is_none() {
            return Err(LoggerError::Uninitialized);
        }

        let (primary, eviction) = {
            let state = lock(&self.state);
            let primary = state
                .file_path
                .clone()
                .ok_or(LoggerError::Uninitialized)?;
            (primary, state.rotation.next_eviction().map(Path::to_path_buf))
        };
        if let Some(evicted) = &eviction {
            remove_rotated(evicted)?;
            lock(&self.state).rotation.evict_oldest();
        }

        let target = rotation::rotated_file_name(&primary, self.clock.now());
        let detached = lock(&self.tree)
            .as_mut()
            .map(std::mem::take)
            .ok_or(LoggerError::Uninitialized)?;

        let rendered = serialize::render(&detached);
        let written = {
            let _io = lock(&self.file_io);
            write(&target, &rendered)
        };
        if let Err(err) = written {
            let records = detached.record_count();
            if let Some(live) = lock(&self.tree).as_mut() {
                let newer = std::mem::replace(live, detached);
                live.merge(newer);
            }
            tracing::warn!(file = %target.display(), records, "Restored tree after failed rotation");
            return Err(err);
        }

        let overflow = lock(&self.state).rotation.retain(target.clone());
        if let Some(path) = overflow {
            if let Err(err) = remove_rotated(&path) {
                self.report(err);
            }
        }
        self.metrics.record_rotation();
        tracing::info!(
            file = %target.display(),
            records = detached.record_count(),
            evicted = ?eviction,
            "Rotated log tree"
        );
        Ok(target)
    }

    /// Flush to disk and release the tree, file path and rotation history.
    ///
    /// The tree is detached before it is rendered, so a record either reaches the final flush
    /// or is dropped as logged after teardown. Safe to call repeatedly; later log calls are
    /// dropped until the next `initialize`.
    pub fn destroy(&self) {
        let _lifecycle = lock(&self.lifecycle);
        let Some(released) = lock(&self.tree).take() else {
            return;
        };
        let path = {
            let mut state = lock(&self.state);
            state.rotation.reset();
            state.file_path.take()
        };

        if let Some(path) = path {
            let rendered = serialize::render(&released);
            let written = {
                let _io = lock(&self.file_io);
                write(&path, &rendered)
            };
            match written {
                Ok(()) => self.metrics.record_dump(),
                Err(err) => self.report(err),
            }
        }
        tracing::debug!(records = released.record_count(), "Tree logger destroyed");
    }

    fn admit(&self, level: Level) -> Option<usize> {
        let (admitted, max_len) = {
            let state = lock(&self.state);
            (state.gate.admit(level), state.max_message_len)
        };
        if !admitted {
            self.metrics.record_filtered();
            return None;
        }
        Some(max_len)
    }

    fn finish_append(&self, outcome: Append, level: Level) {
        match outcome {
            Append::Done(appended) => {
                self.metrics.record_admitted(appended);
                let crossed = lock(&self.state).rotation.record_appended(appended);
                if crossed {
                    self.rotate();
                }
            }
            Append::Uninitialized => {
                self.metrics.record_dropped_uninitialized();
                tracing::debug!(%level, "Dropped record logged before initialization");
            }
            Append::Rejected(_) => {}
        }
    }

    fn report(&self, err: LoggerError) {
        if matches!(err, LoggerError::Uninitialized) {
            tracing::debug!("Skipped file operation on uninitialized tree logger");
            return;
        }

        self.metrics.record_io_failure();
        tracing::error!(error = %err, "Tree logger I/O failure");
        let policy = lock(&self.state).io_failure_policy;
        if policy == IoFailurePolicy::Abort && !std::thread::panicking() {
            panic!("tree logger I/O failure: {err}");
        }
    }
}

impl Drop for TreeLogger {
    fn drop(&mut self) {
        let initialized = self
            .tree
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        if !initialized {
            return;
        }
        if let Err(err) = self.try_dump() {
            self.metrics.record_io_failure();
            tracing::error!(error = %err, "Failed to flush tree logger on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::SteppingClock;
    use serde_json::Value;
    use time::macros::datetime;

    fn logger_in(dir: &Path) -> TreeLogger {
        let logger = TreeLogger::new();
        logger
            .initialize(Level::Info, dir.join("log.json"))
            .expect("initialize");
        logger
    }

    fn parsed_snapshot(logger: &TreeLogger) -> Value {
        serde_json::from_str(&logger.snapshot().expect("snapshot")).unwrap()
    }

    #[test]
    fn new_logger_admits_nothing() {
        let logger = TreeLogger::new();
        assert_eq!(logger.level(), LevelFilter::Off);
        assert!(!logger.enabled(Level::Critical));
        logger.log(&["a"], Level::Critical, "dropped");
        assert_eq!(logger.metrics().records_filtered, 1);
        assert!(!logger.is_initialized());
    }

    #[test]
    fn logging_before_initialize_is_dropped() {
        let logger = TreeLogger::new();
        logger.set_level(Level::Info);
        logger.log(&["a"], Level::Info, "early");
        logger.log_template(Level::Info, "%0@early", &[&"a"]);

        assert!(!logger.is_initialized());
        assert_eq!(logger.pending_records(), 0);
        assert_eq!(logger.metrics().dropped_uninitialized, 2);
        assert!(logger.snapshot().is_none());
    }

    #[test]
    fn set_level_code_ignores_sentinels() {
        let logger = TreeLogger::new();
        logger.set_level(Level::Warn);
        logger.set_level_code(0);
        logger.set_level_code(6);
        assert_eq!(logger.level(), LevelFilter::Level(Level::Warn));
        logger.set_level_code(5);
        assert_eq!(logger.level(), LevelFilter::Level(Level::Debug));
    }

    #[test]
    fn log_rejects_empty_and_reserved_paths() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        let empty: [&str; 0] = [];
        logger.log(&empty, Level::Info, "nowhere");
        logger.log(&["a", "logs"], Level::Info, "reserved");

        assert_eq!(logger.snapshot().as_deref(), Some("{}"));
        assert_eq!(logger.pending_records(), 0);
    }

    #[test]
    fn log_at_records_location() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        let location = Location::new("lib.rs", 7).with_function("logtree::tests");
        logger.log_at(&["foo"], Level::Warn, Some(&location), "located");

        let value = parsed_snapshot(&logger);
        let record = &value["foo"]["logs"][0];
        assert_eq!(record["FileName"], "lib.rs");
        assert_eq!(record["FuncName"], "logtree::tests");
        assert_eq!(record["FileLine"], 7);
        assert_eq!(record["LogLevel"], "WARN");
    }

    #[test]
    fn log_template_spreads_records_over_depths() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        logger.log_template(
            Level::Info,
            "start %s %0@middle %0@end %d",
            &[&"x", &"outer", &"inner", &3],
        );

        let value = parsed_snapshot(&logger);
        assert_eq!(value["logs"][0]["Log"], "start x ");
        assert_eq!(value["outer"]["logs"][0]["Log"], "middle ");
        assert_eq!(value["outer"]["inner"]["logs"][0]["Log"], "end 3");
        assert_eq!(logger.pending_records(), 3);
    }

    #[test]
    fn log_template_rejects_reserved_descent() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        logger.log_template(Level::Info, "a %0@b", &[&"logs"]);
        assert_eq!(logger.record_count(), 0);
    }

    #[test]
    fn messages_are_truncated_to_configured_length() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TreeLogger::new();
        let mut config = LoggerConfig::new(Level::Info, dir.path().join("log.json"));
        config.max_message_len = 4;
        logger.initialize_with(config).unwrap();

        logger.log(&["a"], Level::Info, "truncated");
        assert_eq!(parsed_snapshot(&logger)["a"]["logs"][0]["Log"], "trun");
    }

    #[test]
    fn reinitialize_keeps_records_and_switches_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        logger.log(&["kept"], Level::Info, "before");

        let second = dir.path().join("second.json");
        logger.initialize(Level::Debug, &second).unwrap();
        logger.log(&["kept"], Level::Debug, "after");
        logger.dump();

        let value: Value = serde_json::from_str(&fs::read_to_string(&second).unwrap()).unwrap();
        assert_eq!(value["kept"]["logs"].as_array().unwrap().len(), 2);
        assert_eq!(logger.file_path(), Some(second));
    }

    #[test]
    fn initialize_reports_unopenable_path() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TreeLogger::new();
        let missing = dir.path().join("missing").join("log.json");
        let error = logger.initialize(Level::Info, &missing).unwrap_err();
        assert!(matches!(error, LoggerError::Open { ref path, .. } if path == &missing));
        assert!(!logger.is_initialized());
    }

    #[test]
    fn rotated_file_uses_clock_fields() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(SteppingClock::new(datetime!(2025-08-26 13:07:05.500 UTC)));
        let logger = TreeLogger::with_clock(clock);
        logger
            .initialize(Level::Info, dir.path().join("log.json"))
            .unwrap();

        let target = logger.try_rotate().unwrap();
        assert_eq!(target, dir.path().join("13_7_5_500000000_log.json"));
        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
    }

    #[test]
    fn dump_and_rotate_require_initialization() {
        let logger = TreeLogger::new();
        assert!(matches!(logger.try_dump(), Err(LoggerError::Uninitialized)));
        assert!(matches!(logger.try_rotate(), Err(LoggerError::Uninitialized)));
        logger.dump();
        logger.rotate();
        logger.destroy();
        assert_eq!(logger.metrics().io_failures, 0);
    }

    #[test]
    fn report_policy_counts_write_failures() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TreeLogger::new();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        let mut config = LoggerConfig::new(Level::Info, nested.join("log.json"));
        config.io_failure_policy = IoFailurePolicy::Report;
        logger.initialize_with(config).unwrap();

        fs::remove_dir_all(&nested).unwrap();
        logger.dump();
        assert_eq!(logger.metrics().io_failures, 1);
        assert!(logger.try_dump().is_err());
    }
}
