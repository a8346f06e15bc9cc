//! fsbridge transfer core: chunked HTTP downloads and uploads.
//!
//! Provides background transfer jobs with:
//! - Download engine: bounded manual redirects, 8 KiB copy loop, throttled progress
//! - Upload engine: streamed multipart/form-data or raw bodies with a precomputed length
//! - Memory-bounded upload chunk sizing
//! - Per-job cancellation through a shared registry keyed by job id
//! - Exactly one terminal outcome per job
//! - File hashing (md5, sha1, sha2 family)

pub mod buffer;
pub mod completion;
pub mod config;
pub mod download;
pub mod error;
pub mod hash;
pub mod http;
pub mod job;
pub mod logging;
pub mod manager;
pub mod mime;
pub mod multipart;
pub mod registry;
pub mod storage;
pub mod throttle;
pub mod upload;

// Re-export key types for convenience.
pub use buffer::ChunkSizer;
pub use config::{DOWNLOAD_CHUNK_SIZE, TransferConfig};
pub use download::DownloadSpec;
pub use error::{Result, TransferError};
pub use hash::{HashAlgorithm, hash_file};
pub use job::JobHandle;
pub use logging::{JobEvent, JobLog, NullLogger, TracingLogger, TransferLogger};
pub use manager::TransferManager;
pub use mime::{ExtensionTable, FALLBACK_CONTENT_TYPE, MimeResolver};
pub use multipart::{BOUNDARY, BodyPlan};
pub use registry::JobRegistry;
pub use storage::LocalStorage;
pub use throttle::{ProgressThrottle, ThrottleStrategy};
pub use upload::UploadSpec;

pub use fsbridge_types as types;
