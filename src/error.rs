//! Error types for the job engine.

use thiserror::Error;

use crate::job::JobId;

/// SFTP status code for a missing file (`SSH_FX_NO_SUCH_FILE`).
const SFTP_NO_SUCH_FILE: i32 = 2;

/// Main error type for remote and job operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The remote object or directory does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// A required field is missing or malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The remote session could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Target configuration could not be parsed.
    #[error("invalid target config: {0}")]
    InvalidTargetConfig(String),

    /// No job with this id was ever registered.
    #[error("operation not found: {0}")]
    JobNotFound(JobId),

    /// SSH or SFTP protocol error.
    #[error("ssh error: {0}")]
    Ssh(#[from] ssh2::Error),

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the target is absent, regardless of backend.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Error::Ssh(e) => matches!(e.code(), ssh2::ErrorCode::SFTP(SFTP_NO_SUCH_FILE)),
            _ => false,
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
