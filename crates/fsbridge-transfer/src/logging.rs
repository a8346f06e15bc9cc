//! Structured job logging.
//!
//! The engines report lifecycle and per-chunk activity as `JobLog` entries.
//! Where they end up is the logger's business: `tracing`, nowhere, or a host
//! supplied sink.

use std::fmt;

use fsbridge_types::{Direction, JobId};

/// Structured log entry for one job.
#[derive(Debug, Clone)]
pub struct JobLog {
    pub component: &'static str,
    pub job_id: JobId,
    pub event: JobEvent,
}

impl JobLog {
    pub fn new(component: &'static str, job_id: JobId, event: JobEvent) -> Self {
        Self { component, job_id, event }
    }
}

/// Job events that can be logged.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// Manager: job registered and handed to a worker
    Submitted {
        direction: Direction,
        target: String,
    },
    /// Download: redirect followed
    Redirected {
        status: u16,
        location: String,
    },
    /// Download: final response received
    ResponseStarted {
        status: u16,
        content_length: Option<u64>,
    },
    /// Upload: request body laid out
    RequestPlanned {
        content_length: u64,
        files: usize,
        multipart: bool,
    },
    /// Bytes moved in one copy loop iteration
    ChunkMoved {
        size: usize,
        total: u64,
    },
    /// Stopped by request
    Aborted {
        bytes: u64,
    },
    Completed {
        status: u16,
        bytes: u64,
        duration_ms: u64,
    },
    Failed {
        message: String,
    },
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted { direction, target } => {
                write!(f, "submitted direction={} target={}", direction, target)
            }
            Self::Redirected { status, location } => {
                write!(f, "redirected status={} location={}", status, location)
            }
            Self::ResponseStarted { status, content_length } => match content_length {
                Some(len) => write!(f, "response_started status={} content_length={}", status, len),
                None => write!(f, "response_started status={} content_length=unknown", status),
            },
            Self::RequestPlanned { content_length, files, multipart } => {
                write!(f, "request_planned content_length={} files={} multipart={}", content_length, files, multipart)
            }
            Self::ChunkMoved { size, total } => {
                write!(f, "chunk_moved size={} total={}", size, total)
            }
            Self::Aborted { bytes } => {
                write!(f, "aborted bytes={}", bytes)
            }
            Self::Completed { status, bytes, duration_ms } => {
                write!(f, "completed status={} bytes={} duration_ms={}", status, bytes, duration_ms)
            }
            Self::Failed { message } => {
                write!(f, "failed: {}", message)
            }
        }
    }
}

/// Trait for job logging. Implementations can forward to `tracing`, to the
/// host, or discard entries.
pub trait TransferLogger: Send + Sync {
    fn log(&self, entry: JobLog);
}

/// Logger that uses the `tracing` crate.
pub struct TracingLogger;

impl TransferLogger for TracingLogger {
    fn log(&self, entry: JobLog) {
        // Per-chunk entries are debug-only; they fire every few KiB.
        match &entry.event {
            JobEvent::ChunkMoved { .. } => {
                tracing::debug!(
                    component = entry.component,
                    job_id = %entry.job_id,
                    "{}",
                    entry.event,
                );
            }
            JobEvent::Aborted { .. } | JobEvent::Failed { .. } => {
                tracing::warn!(
                    component = entry.component,
                    job_id = %entry.job_id,
                    "{}",
                    entry.event,
                );
            }
            _ => {
                tracing::info!(
                    component = entry.component,
                    job_id = %entry.job_id,
                    "{}",
                    entry.event,
                );
            }
        }
    }
}

/// No-op logger that discards all log entries.
pub struct NullLogger;

impl TransferLogger for NullLogger {
    fn log(&self, _entry: JobLog) {}
}
