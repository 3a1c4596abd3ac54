//! Error definitions for the tree logger.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors raised by logger operations that touch the filesystem.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The configured primary file could not be opened for writing.
    #[error("failed to open log file {}: {source}", path.display())]
    Open {
        /// File we attempted to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Writing a rendered tree failed.
    #[error("failed to write log file {}: {source}", path.display())]
    Write {
        /// File we attempted to write.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Deleting an evicted rotated file failed.
    #[error("failed to remove rotated file {}: {source}", path.display())]
    Remove {
        /// File we attempted to delete.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The operation needs a tree and a file path, but `initialize` has not run.
    #[error("logger is not initialized")]
    Uninitialized,
}
