//! Error type for transfer jobs and their collaborators.
//!
//! Every failure inside a job is converted into a `TransferError` and handed
//! to the job's completion channel. The host sees it as a code/message pair
//! through [`TransferError::to_failure`].

use std::io;
use std::path::{Path, PathBuf};

use fsbridge_types::{Direction, FailureCode, JobId, TransferFailure};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransferError>;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Target path or resource does not exist
    #[error("ENOENT: no such file or directory, open '{}'", path.display())]
    NotFound { path: PathBuf },

    /// A regular file was required but the path is a directory
    #[error("EISDIR: illegal operation on a directory, open '{}'", path.display())]
    IsDirectory { path: PathBuf },

    /// Stopped by an explicit stop request
    #[error("{0} has been aborted")]
    Aborted(Direction),

    /// Connection, TLS, timeout or protocol failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Disk or stream failure not tied to a known path condition
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed job description, rejected before any I/O
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The job's worker went away without reporting an outcome
    #[error("Transfer ended without reporting a result")]
    Interrupted,
}

impl TransferError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Classify an I/O error raised while operating on `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path: path.to_path_buf() },
            io::ErrorKind::IsADirectory => Self::IsDirectory { path: path.to_path_buf() },
            _ => Self::Io(err),
        }
    }

    pub fn code(&self) -> FailureCode {
        match self {
            Self::NotFound { .. } => FailureCode::NotFound,
            Self::IsDirectory { .. } => FailureCode::IsDirectory,
            Self::Aborted(_) => FailureCode::Aborted,
            Self::Http(_) | Self::Io(_) => FailureCode::Transport,
            Self::InvalidConfig(_) => FailureCode::InvalidConfig,
            Self::Interrupted => FailureCode::Interrupted,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    pub fn to_failure(&self, job_id: JobId) -> TransferFailure {
        TransferFailure {
            job_id,
            code: self.code(),
            message: self.to_string(),
        }
    }
}
