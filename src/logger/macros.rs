/// Log a formatted message under an explicit path, tagged with the caller's location.
///
/// ```no_run
/// use logtree::{Level, TreeLogger, tree_log};
///
/// let logger = TreeLogger::new();
/// logger.initialize(Level::Info, "log.json").unwrap();
/// tree_log!(logger, Level::Warn, &["net", "retry"], "attempt {} failed", 3);
/// ```
///
/// The message is only formatted when the level passes the logger's threshold.
#[macro_export]
macro_rules! tree_log {
    ($logger:expr, $level:expr, $path:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.enabled(level) {
            let location = $crate::Location::new($crate::Location::basename(file!()), line!())
                .with_function(module_path!());
            logger.log_at($path, level, Some(&location), &format!($($arg)+));
        }
    }};
}

/// [`tree_log!`] at [`Level::Critical`](crate::Level::Critical).
#[macro_export]
macro_rules! tree_critical {
    ($logger:expr, $path:expr, $($arg:tt)+) => {
        $crate::tree_log!($logger, $crate::Level::Critical, $path, $($arg)+)
    };
}

/// [`tree_log!`] at [`Level::Error`](crate::Level::Error).
#[macro_export]
macro_rules! tree_error {
    ($logger:expr, $path:expr, $($arg:tt)+) => {
        $crate::tree_log!($logger, $crate::Level::Error, $path, $($arg)+)
    };
}

/// [`tree_log!`] at [`Level::Warn`](crate::Level::Warn).
#[macro_export]
macro_rules! tree_warn {
    ($logger:expr, $path:expr, $($arg:tt)+) => {
        $crate::tree_log!($logger, $crate::Level::Warn, $path, $($arg)+)
    };
}

/// [`tree_log!`] at [`Level::Info`](crate::Level::Info).
#[macro_export]
macro_rules! tree_info {
    ($logger:expr, $path:expr, $($arg:tt)+) => {
        $crate::tree_log!($logger, $crate::Level::Info, $path, $($arg)+)
    };
}

/// [`tree_log!`] at [`Level::Debug`](crate::Level::Debug).
#[macro_export]
macro_rules! tree_debug {
    ($logger:expr, $path:expr, $($arg:tt)+) => {
        $crate::tree_log!($logger, $crate::Level::Debug, $path, $($arg)+)
    };
}
