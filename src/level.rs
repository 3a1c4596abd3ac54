//! Severity levels and the threshold gate that decides which records are kept.
//!
//! Levels are totally ordered by verbosity: `Critical` is the most severe and
//! `Debug` the most verbose. A record is admitted when its level is at least as
//! severe as the configured threshold. Numeric codes `0` and `6` are the two
//! sentinels that bracket the valid range.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Code of the lower sentinel; never a valid level.
pub const LEVEL_CODE_START: u8 = 0;
/// Code of the upper sentinel; never a valid level.
pub const LEVEL_CODE_END: u8 = 6;

/// Severity attached to every record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Level {
    /// Unrecoverable conditions.
    Critical = 1,
    /// Failed operations.
    Error = 2,
    /// Suspicious but tolerated conditions.
    Warn = 3,
    /// Normal progress reports.
    Info = 4,
    /// Verbose diagnostics.
    Debug = 5,
}

impl Level {
    /// All levels from most to least severe.
    pub const ALL: [Level; 5] = [
        Level::Critical,
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
    ];

    /// Name written to the `LogLevel` field of serialized records.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Critical => "CRITICAL",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }

    /// Numeric code of the level.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Map a numeric code back to a level; sentinels and out-of-range codes yield `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Level::Critical),
            2 => Some(Level::Error),
            3 => Some(Level::Warn),
            4 => Some(Level::Info),
            5 => Some(Level::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" => Ok(Self::Critical),
            "ERROR" => Ok(Self::Error),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            _ => Err(()),
        }
    }
}

/// Threshold held by the gate: either nothing passes, or everything at least as severe as a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LevelFilter {
    /// Start sentinel; no typed record is admitted.
    #[default]
    Off,
    /// Admit records whose level is at least as severe as the contained one.
    Level(Level),
}

impl LevelFilter {
    /// Return the contained level, if any.
    pub fn level(self) -> Option<Level> {
        match self {
            LevelFilter::Off => None,
            LevelFilter::Level(level) => Some(level),
        }
    }

    fn code(self) -> u8 {
        match self {
            LevelFilter::Off => LEVEL_CODE_START,
            LevelFilter::Level(level) => level.code(),
        }
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        LevelFilter::Level(level)
    }
}

/// Single mutable severity threshold.
#[derive(Clone, Copy, Debug, Default)]
pub struct LevelGate {
    threshold: LevelFilter,
}

impl LevelGate {
    /// Build a gate with the given threshold.
    pub fn new(threshold: LevelFilter) -> Self {
        Self { threshold }
    }

    /// Current threshold.
    pub fn threshold(&self) -> LevelFilter {
        self.threshold
    }

    /// Replace the threshold.
    pub fn set_threshold(&mut self, level: Level) {
        self.threshold = LevelFilter::Level(level);
    }

    /// Replace the threshold from a raw code, ignoring sentinels and out-of-range values.
    ///
    /// Returns whether the threshold changed.
    pub fn set_threshold_code(&mut self, code: u8) -> bool {
        match Level::from_code(code) {
            Some(level) => {
                self.set_threshold(level);
                true
            }
            None => false,
        }
    }

    /// Decide whether a record at `level` should be recorded.
    pub fn admit(&self, level: Level) -> bool {
        self.admit_code(level.code())
    }

    /// Decide on a raw code. Codes outside the open range `(START, END)` are always admitted.
    pub fn admit_code(&self, code: u8) -> bool {
        let filtered = code > LEVEL_CODE_START && code > self.threshold.code() && code < LEVEL_CODE_END;
        !filtered
    }
}
