//! Log records and the time source used to stamp them.

use crate::level::Level;
use serde::{Serialize, Serializer};
use std::fmt;
use time::{OffsetDateTime, macros::format_description};

/// Default upper bound on the number of characters kept per message.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 256;

/// Wall-clock source with sub-second resolution.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the system's local time, falling back to UTC when the offset is unknown.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

/// Caller-supplied source location attached to a record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    /// Source file name.
    pub file: Option<String>,
    /// Enclosing function or module.
    pub function: Option<String>,
    /// Line number within `file`.
    pub line: Option<u32>,
}

impl Location {
    /// Location with a file and line.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: Some(file.into()),
            function: None,
            line: Some(line),
        }
    }

    /// Builder-style method for setting the function name.
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Strip directories from a `file!()` path.
    pub fn basename(path: &str) -> &str {
        path.rsplit(['/', '\\']).next().unwrap_or(path)
    }
}

/// One log entry stored under a tree node's `logs` array.
#[derive(Clone, Debug, Serialize)]
pub struct Record {
    /// When the record was formatted.
    #[serde(rename = "Time", serialize_with = "serialize_timestamp")]
    pub timestamp: OffsetDateTime,
    /// Severity of the record.
    #[serde(rename = "LogLevel")]
    pub level: Level,
    /// Source file, when known.
    #[serde(rename = "FileName", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source function, when known.
    #[serde(rename = "FuncName", skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Source line, when known.
    #[serde(rename = "FileLine", skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Formatted message, bounded in length.
    #[serde(rename = "Log")]
    pub message: String,
}

impl Record {
    /// Build a record stamped with `clock`, truncating `message` to `max_len` characters.
    pub fn new(
        clock: &dyn Clock,
        level: Level,
        location: Option<&Location>,
        message: &str,
        max_len: usize,
    ) -> Self {
        let location = location.cloned().unwrap_or_default();
        Self {
            timestamp: clock.now(),
            level,
            file: location.file,
            function: location.function,
            line: location.line,
            message: truncate_message(message, max_len).to_string(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", format_timestamp(self.timestamp), self.level, self.message)
    }
}

/// Cut `message` to at most `max_len` characters without splitting a code point.
pub fn truncate_message(message: &str, max_len: usize) -> &str {
    match message.char_indices().nth(max_len) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS.nnnnnnnnn`.
pub fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:9]"
        ))
        .unwrap_or_else(|_| "1970-01-01 00:00:00.000000000".to_string())
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &OffsetDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*timestamp))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use time::macros::datetime;

    /// Clock that returns a fixed instant, advanced one millisecond per call.
    pub(crate) struct SteppingClock(Mutex<OffsetDateTime>);

    impl SteppingClock {
        pub(crate) fn new(start: OffsetDateTime) -> Self {
            Self(Mutex::new(start))
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> OffsetDateTime {
            let mut guard = self.0.lock().unwrap();
            let now = *guard;
            *guard = now + time::Duration::milliseconds(1);
            now
        }
    }

    #[test]
    fn truncate_message_respects_char_boundaries() {
        assert_eq!(truncate_message("hello", 3), "hel");
        assert_eq!(truncate_message("hello", 10), "hello");
        assert_eq!(truncate_message("héllo", 2), "hé");
        assert_eq!(truncate_message("", 0), "");
    }

    #[test]
    fn record_serializes_with_output_keys() {
        let clock = SteppingClock::new(datetime!(2025-08-26 09:05:03.000000042 UTC));
        let location = Location::new("main.rs", 12).with_function("main");
        let record = Record::new(&clock, Level::Warn, Some(&location), "disk low", 256);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "Time": "2025-08-26 09:05:03.000000042",
                "LogLevel": "WARN",
                "FileName": "main.rs",
                "FuncName": "main",
                "FileLine": 12,
                "Log": "disk low",
            })
        );
    }

    #[test]
    fn record_omits_missing_location() {
        let clock = SteppingClock::new(datetime!(2025-01-01 00:00:00 UTC));
        let record = Record::new(&clock, Level::Info, None, "bar", 256);
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("FileName"));
        assert!(!object.contains_key("FuncName"));
        assert!(!object.contains_key("FileLine"));
        assert_eq!(object["Log"], "bar");
    }

    #[test]
    fn record_truncates_long_messages() {
        let clock = SystemClock;
        let long = "x".repeat(DEFAULT_MAX_MESSAGE_LEN + 50);
        let record = Record::new(&clock, Level::Debug, None, &long, DEFAULT_MAX_MESSAGE_LEN);
        assert_eq!(record.message.chars().count(), DEFAULT_MAX_MESSAGE_LEN);
    }

    #[test]
    fn basename_strips_directories() {
        assert_eq!(Location::basename("src/bin/tool.rs"), "tool.rs");
        assert_eq!(Location::basename("lib.rs"), "lib.rs");
    }
}
