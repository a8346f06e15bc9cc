use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Flat header map. One value per name; keys are unique.
pub type Headers = BTreeMap<String, String>;

/// Caller-assigned job identifier. Unique among concurrently active jobs and
/// used as the correlation key on every event and result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for JobId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Download,
    Upload,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download => f.write_str("download"),
            Self::Upload => f.write_str("upload"),
        }
    }
}

// -- Download --

/// Options for one download, as submitted by the host.
///
/// Timeouts are milliseconds; `None` means "use the configured default" and
/// `Some(0)` disables the timeout. `progress_interval` wins over
/// `progress_divider` whenever it is non-zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOptions {
    pub from_url: String,
    pub to_file: PathBuf,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub connection_timeout: Option<u64>,
    #[serde(default)]
    pub read_timeout: Option<u64>,
    #[serde(default)]
    pub progress_interval: u64,
    #[serde(default)]
    pub progress_divider: i32,
    #[serde(default)]
    pub max_redirects: Option<u8>,
    #[serde(default = "enabled")]
    pub has_begin_callback: bool,
    #[serde(default = "enabled")]
    pub has_progress_callback: bool,
}

impl DownloadOptions {
    pub fn new(from_url: impl Into<String>, to_file: impl Into<PathBuf>) -> Self {
        Self {
            from_url: from_url.into(),
            to_file: to_file.into(),
            headers: Headers::new(),
            connection_timeout: None,
            read_timeout: None,
            progress_interval: 0,
            progress_divider: 0,
            max_redirects: None,
            has_begin_callback: true,
            has_progress_callback: true,
        }
    }
}

// -- Upload --

/// One local file to send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileItem {
    /// Form field name. Falls back to `filename` when absent or empty.
    #[serde(default)]
    pub name: Option<String>,
    pub filename: String,
    pub filepath: PathBuf,
    /// Explicit content type. Looked up from the filename extension when absent.
    #[serde(default)]
    pub filetype: Option<String>,
}

impl UploadFileItem {
    pub fn new(name: impl Into<String>, filename: impl Into<String>, filepath: impl Into<PathBuf>) -> Self {
        Self {
            name: Some(name.into()),
            filename: filename.into(),
            filepath: filepath.into(),
            filetype: None,
        }
    }

    /// The form field name actually sent.
    pub fn field_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.filename,
        }
    }
}

/// Options for one upload, as submitted by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOptions {
    pub to_url: String,
    pub files: Vec<UploadFileItem>,
    #[serde(default)]
    pub headers: Headers,
    /// Form fields, sent before the files. Ignored in binary stream mode.
    #[serde(default)]
    pub fields: Headers,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub binary_stream_only: bool,
    #[serde(default = "enabled")]
    pub has_begin_callback: bool,
    #[serde(default = "enabled")]
    pub has_progress_callback: bool,
}

impl UploadOptions {
    pub fn new(to_url: impl Into<String>, files: Vec<UploadFileItem>) -> Self {
        Self {
            to_url: to_url.into(),
            files,
            headers: Headers::new(),
            fields: Headers::new(),
            method: None,
            binary_stream_only: false,
            has_begin_callback: true,
            has_progress_callback: true,
        }
    }
}

fn enabled() -> bool {
    true
}
