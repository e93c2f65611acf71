use thiserror::Error as ThisError;

/// Errors that can occur in the logging library.
///
/// Producers never see these synchronously: the write path is
/// fire-and-forget and failures surface only on the diagnostic
/// side-channel. The variants classify what the background worker or a
/// constructor hit.
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Backup rename or new-file open failed during rotation. Fatal for
    /// the worker that hit it.
    #[error("rotation error: {0}")]
    Rotation(std::io::Error),
    /// Append to the active log file failed. Fatal for the worker.
    #[error("log write error: {0}")]
    Write(std::io::Error),
    /// Listing the log directory for retention failed. Non-fatal; pruning
    /// is skipped for the cycle.
    #[error("readdir error: {0}")]
    ReadDir(std::io::Error),
    /// Timestamp conversion or formatting failed.
    #[error("time error: {0}")]
    Time(#[from] time::error::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
