/// Error taxonomy for the core crate.
///
/// Enumeration and file operations surface these synchronously to their
/// caller. Watcher subscription failures never reach a caller through a
/// return value; they are logged and recorded on the watcher handle.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The OS device-inventory query channel could not be reached.
#[derive(Debug, Clone, Error)]
pub enum EnumerationError {
    /// The management service or query API refused the request.
    #[error("device inventory unavailable: {0}")]
    Unavailable(String),

    /// The query ran but its result could not be read.
    #[error("device inventory query failed: {0}")]
    Query(String),
}

/// The watcher could not establish (or lost) its notification channel.
///
/// `Clone` so the last failure can be kept on the watcher handle and read
/// from the UI thread.
#[derive(Debug, Clone, Error)]
pub enum SubscriptionError {
    /// Opening the notification channel failed at startup.
    #[error("failed to subscribe to volume notifications: {0}")]
    Connect(String),

    /// Waiting on an established channel failed irrecoverably.
    #[error("volume notification wait failed: {0}")]
    Wait(String),

    /// The notification source went away.
    #[error("volume notification channel closed")]
    Closed,
}

/// A user-initiated file operation failed.
#[derive(Debug, Error)]
pub enum FileOpError {
    /// The selected volume no longer resolves to a directory.
    #[error("mount unavailable: {}", .0.display())]
    MountUnavailable(PathBuf),

    /// The relative path is empty or escapes the mount root.
    #[error("invalid relative path: {0:?}")]
    InvalidPath(String),

    /// The OS rejected the operation (permission, space, path conflict).
    #[error("{op} failed for {}: {source}", path.display())]
    Operation {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A copy was cancelled before it finished.
    #[error("copy cancelled")]
    Cancelled,
}

impl FileOpError {
    pub(crate) fn op(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| FileOpError::Operation { op, path, source }
    }
}

/// Writing a USB inventory export failed.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
