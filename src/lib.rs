#![deny(missing_docs)]

//! Concurrent hierarchical log aggregator.
//!
//! Records are filed under a path of node names, accumulated in an in-memory tree and written
//! out as a JSON document. After a configurable number of records the tree is rotated into a
//! timestamped side file, keeping a bounded history of rotated files.

/// Environment-driven configuration management.
pub mod config;
/// Severity levels and the threshold gate.
pub mod level;
/// Tree logger service, shared instance and logging macros.
pub mod logger;
/// Tracing setup for the crate's own diagnostics.
pub mod logging;
/// Logger activity counters.
pub mod metrics;
/// Log records, source locations and the time source.
pub mod record;
/// Rotation bookkeeping and rotated file naming.
pub mod rotation;
/// JSON rendering of the log tree.
pub mod serialize;
/// Message templates with embedded path-descent directives.
pub mod template;
/// Arena-backed log tree.
pub mod tree;

pub use config::{IoFailurePolicy, LoggerConfig};
pub use level::{Level, LevelFilter};
pub use logger::{FlushGuard, LoggerError, TreeLogger, global, init_global, init_global_with};
pub use record::{Location, Record};
pub use template::DESCEND;
