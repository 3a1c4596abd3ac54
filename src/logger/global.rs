//! Process-wide shared logger for call sites that prefer ambient logging.

use super::{LoggerError, TreeLogger};
use crate::{config::LoggerConfig, level::Level};
use std::path::Path;
use std::sync::OnceLock;

static GLOBAL: OnceLock<TreeLogger> = OnceLock::new();

/// The shared logger, created uninitialized on first use.
///
/// Initialize it through [`init_global`] or [`init_global_with`] and keep the returned
/// [`FlushGuard`]. The static is never dropped, so calling `global().initialize(..)` directly
/// leaves no exit flush in place: records are only written by explicit `dump`, `rotate` or
/// `destroy` calls.
pub fn global() -> &'static TreeLogger {
    GLOBAL.get_or_init(TreeLogger::new)
}

/// Initialize the shared logger and return the guard that flushes it on scope exit.
///
/// Keep the guard alive in `main`; statics are never dropped, so the guard is what writes the
/// final dump when the process winds down.
pub fn init_global(level: Level, file_path: impl AsRef<Path>) -> Result<FlushGuard, LoggerError> {
    global().initialize(level, file_path)?;
    Ok(FlushGuard { _private: () })
}

/// [`init_global`] with a full configuration.
pub fn init_global_with(config: LoggerConfig) -> Result<FlushGuard, LoggerError> {
    global().initialize_with(config)?;
    Ok(FlushGuard { _private: () })
}

/// Destroys the shared logger when dropped, flushing its tree to disk.
#[must_use = "dropping the guard immediately flushes and tears down the shared logger"]
#[derive(Debug)]
pub struct FlushGuard {
    _private: (),
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        global().destroy();
    }
}
