use serde::{Deserialize, Serialize};

use crate::models::{Headers, JobId};

/// Events emitted by a running job, in order, before its terminal result.
///
/// The variant name doubles as the host event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum TransferEvent {
    /// Response headers arrived with a 2xx status
    DownloadBegin {
        job_id: JobId,
        status_code: u16,
        /// `None` when the server did not announce a length
        content_length: Option<u64>,
        headers: Headers,
    },

    /// Bytes were written to the destination file
    DownloadProgress {
        job_id: JobId,
        content_length: Option<u64>,
        bytes_written: u64,
    },

    /// The request body is about to be sent
    UploadBegin { job_id: JobId },

    /// A chunk of the request body was handed to the connection
    UploadProgress {
        job_id: JobId,
        total_bytes_expected_to_send: u64,
        total_bytes_sent: u64,
    },
}

impl TransferEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::DownloadBegin { job_id, .. }
            | Self::DownloadProgress { job_id, .. }
            | Self::UploadBegin { job_id }
            | Self::UploadProgress { job_id, .. } => *job_id,
        }
    }

    pub fn is_progress(&self) -> bool {
        matches!(self, Self::DownloadProgress { .. } | Self::UploadProgress { .. })
    }

    /// Progress as `(total, transferred)`, if this is a progress event.
    pub fn progress(&self) -> Option<(Option<u64>, u64)> {
        match self {
            Self::DownloadProgress { content_length, bytes_written, .. } => {
                Some((*content_length, *bytes_written))
            }
            Self::UploadProgress { total_bytes_expected_to_send, total_bytes_sent, .. } => {
                Some((Some(*total_bytes_expected_to_send), *total_bytes_sent))
            }
            _ => None,
        }
    }
}
