use crate::{
    level::Level,
    record::DEFAULT_MAX_MESSAGE_LEN,
    rotation::{DEFAULT_MAX_RECORDS, DEFAULT_RETAINED_FILES},
};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// What to do when writing or deleting a log file fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoFailurePolicy {
    /// Emit a diagnostic and carry on.
    Report,
    /// Emit a diagnostic, then panic.
    Abort,
}

impl Default for IoFailurePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Abort
        } else {
            Self::Report
        }
    }
}

impl std::str::FromStr for IoFailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "abort" => Ok(Self::Abort),
            _ => Err(()),
        }
    }
}

/// Runtime configuration for a tree logger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Primary file overwritten by every dump.
    pub file_path: PathBuf,
    /// Least severe level that is still recorded.
    pub level: Level,
    /// Admitted records after which the tree is rotated.
    pub max_records: u64,
    /// Number of rotated files kept on disk.
    pub retained_files: usize,
    /// Maximum characters kept per message.
    pub max_message_len: usize,
    /// Reaction to file I/O failures.
    pub io_failure_policy: IoFailurePolicy,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("log.json"),
            level: Level::Info,
            max_records: DEFAULT_MAX_RECORDS,
            retained_files: DEFAULT_RETAINED_FILES,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            io_failure_policy: IoFailurePolicy::default(),
        }
    }
}

impl LoggerConfig {
    /// Configuration writing to `file_path` at `level`, other settings at their defaults.
    pub fn new(level: Level, file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            level,
            ..Self::default()
        }
    }

    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup. Every variable is optional.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let load = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            file_path: load("LOGTREE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.file_path),
            level: load("LOGTREE_LEVEL")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("LOGTREE_LEVEL".into()))
                })
                .transpose()?
                .unwrap_or(defaults.level),
            max_records: parse_positive(load("LOGTREE_MAX_RECORDS"), "LOGTREE_MAX_RECORDS")?
                .unwrap_or(defaults.max_records),
            retained_files: parse_positive(
                load("LOGTREE_RETAINED_FILES"),
                "LOGTREE_RETAINED_FILES",
            )?
            .unwrap_or(defaults.retained_files),
            max_message_len: parse_positive(
                load("LOGTREE_MAX_MESSAGE_LEN"),
                "LOGTREE_MAX_MESSAGE_LEN",
            )?
            .unwrap_or(defaults.max_message_len),
            io_failure_policy: load("LOGTREE_IO_POLICY")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("LOGTREE_IO_POLICY".into()))
                })
                .transpose()?
                .unwrap_or(defaults.io_failure_policy),
        })
    }
}

fn parse_positive<T>(value: Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    value
        .map(|raw| match raw.trim().parse::<T>() {
            Ok(parsed) if parsed != T::default() => Ok(parsed),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}
