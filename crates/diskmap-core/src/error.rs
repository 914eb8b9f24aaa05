//! Error types for diskmap-core.
//!
//! Only failures that abort an operation are modelled here. Per-entry and
//! per-directory access errors during a scan are recovered locally and
//! reported through [`crate::scanner::progress::ScanProgress::Error`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the on-disk store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying read or write failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No store file exists at the given path.
    #[error("no store file at '{}'", .0.display())]
    Missing(PathBuf),

    /// The trailing index pointer or the index itself is unusable.
    #[error("corrupt store '{}': {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// A read was attempted on a handle that is not open.
    #[error("store is not open")]
    Closed,

    /// A stored value could not be encoded or decoded.
    #[error("store codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl StoreError {
    /// `true` when the error means "there is no usable prior scan".
    ///
    /// Callers recover from these by discarding the file and rescanning.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::Missing(_) | Self::Corrupt { .. })
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that abort a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The scan root does not exist or is not a directory.
    #[error("cannot scan '{}': {source}", .path.display())]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn scan worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// A worker thread panicked; the record set is incomplete.
    #[error("a scan worker panicked")]
    WorkerPanicked,

    /// Persisting the scan result failed. The previous store, if any, is intact.
    #[error("failed to save scan result: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
