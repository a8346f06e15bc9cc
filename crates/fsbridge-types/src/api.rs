use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Headers, JobId};

// -- Results --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    pub job_id: JobId,
    /// Status of the final (post-redirect) response
    pub status_code: u16,
    /// Zero for any non-2xx response
    pub bytes_written: u64,
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub job_id: JobId,
    pub status_code: u16,
    pub headers: Headers,
    pub body: String,
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

// -- Failures --

/// Stable error codes handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCode {
    #[serde(rename = "ENOENT")]
    NotFound,
    #[serde(rename = "EISDIR")]
    IsDirectory,
    #[serde(rename = "EABORTED")]
    Aborted,
    #[serde(rename = "ETRANSPORT")]
    Transport,
    #[serde(rename = "EINVAL")]
    InvalidConfig,
    #[serde(rename = "EINTERRUPTED")]
    Interrupted,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "ENOENT",
            Self::IsDirectory => "EISDIR",
            Self::Aborted => "EABORTED",
            Self::Transport => "ETRANSPORT",
            Self::InvalidConfig => "EINVAL",
            Self::Interrupted => "EINTERRUPTED",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a job: a code/message pair in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFailure {
    pub job_id: JobId,
    pub code: FailureCode,
    pub message: String,
}
