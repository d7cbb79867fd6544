//! Error types for engine tasks.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the engine crates.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can abort an engine task.
///
/// Per-entry failures during a walk never surface here; they are logged and
/// skipped by the walker. Only failures that concern the task's own target,
/// its input, or persisted state make it to the dispatcher.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation was cancelled cooperatively.
    #[error("cancelled")]
    Cancelled,

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Target path is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// No index file exists yet.
    #[error("Search index not found at {path}; build the index before searching")]
    IndexMissing { path: PathBuf },

    /// The index file exists but cannot be parsed.
    #[error("Search index at {path} is corrupted ({message}); delete it and rebuild")]
    IndexCorrupted { path: PathBuf, message: String },

    /// The index parsed fine but holds no entries.
    #[error("Search index at {path} is empty; rebuild the index")]
    IndexEmpty { path: PathBuf },

    /// Request rejected before any I/O.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl EngineError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid-input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether this is the cooperative cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
