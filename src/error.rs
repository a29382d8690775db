/// Error handling module for worldsmith.
///
/// This module defines the error types used throughout the library.
/// It provides a set of errors covering configuration, process control,
/// and backup operations, along with helpful context for debugging.
///
/// # Example
///
/// ```
/// use worldsmith::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::BackupNotFound(name)) => println!("Backup '{}' does not exist", name),
///         Err(Error::StillRunning) => println!("Stop the server first"),
///         Err(Error::ProcessIo(msg)) => println!("Console pipe failed: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the worldsmith library.
///
/// Each variant distinguishes "already in that state" from "not permitted
/// now" from "not found", so a UI layer can render an accurate message
/// without reimplementing domain logic.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    ///
    /// This error occurs when:
    /// - The configuration JSON is malformed
    /// - Required fields are missing
    /// - Field types are incorrect
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains values that fail validation.
    ///
    /// This error occurs when:
    /// - The launch command is empty
    /// - A schedule string is malformed
    /// - A schedule is required by an enabled policy but absent
    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    /// Writing to or stopping the server console failed because the pipe
    /// is closed or broken.
    ///
    /// Recoverable: reported to the caller, never fatal to the supervisor.
    #[error("Process I/O error: {0}")]
    ProcessIo(String),

    /// Error spawning or reaping the server process.
    #[error("Server process error: {0}")]
    Process(String),

    /// A bounded wait expired.
    ///
    /// This error occurs when:
    /// - A graceful stop is issued but the process does not exit within
    ///   the stop timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The server is already running.
    #[error("Already running")]
    AlreadyRunning,

    /// The server is not running.
    #[error("Not running")]
    NotRunning,

    /// A backup restore was attempted while the server is supposed to be
    /// running. Rejected with no state change.
    #[error("Cannot restore a backup while the server is running")]
    StillRunning,

    /// An operation referenced a backup that does not exist.
    /// Rejected with no state change.
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// A manual backup name collides with an existing entry.
    /// Rejected before any filesystem mutation.
    #[error("A backup with that name already exists: {0}")]
    NameCollision(String),

    /// Filesystem failure while copying or deleting world data during a
    /// backup or restore.
    ///
    /// The operation is aborted and the saving flag restored, but world
    /// directories are left in whatever partial state the failure occurred
    /// in. Known gap: the delete-then-copy restore sequence has no rollback.
    #[error("World copy failed: {0}")]
    Copy(String),

    /// A log listener failed to accept a delivered line.
    ///
    /// Swallowed during broadcast: one listener failing never prevents
    /// delivery to the others.
    #[error("Listener error: {0}")]
    Listener(String),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for worldsmith operations.
///
/// This is a convenience type alias for `std::result::Result` with the `Error`
/// type from this module.
pub type Result<T> = std::result::Result<T, Error>;
