//! Data shared between the transfer core and the host runtime.
//!
//! Everything here is plain serde data: the options a host passes in when it
//! submits a job, the events a running job emits, and the terminal payloads.
//! Field names follow the host's camelCase JSON.

pub mod api;
pub mod events;
pub mod models;

pub use api::{DownloadResult, FailureCode, TransferFailure, UploadResult};
pub use events::TransferEvent;
pub use models::{Direction, DownloadOptions, Headers, JobId, UploadFileItem, UploadOptions};
