use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{Result, TransferError};

/// What the engines need to know about a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub is_dir: bool,
}

/// Local filesystem access for the transfer engines.
///
/// Resolves paths to async streams and classifies failures as not-found or
/// is-a-directory so the host gets stable error codes.
#[derive(Debug, Clone, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    pub async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| TransferError::from_io(path, e))?;
        Ok(FileInfo {
            path: path.to_path_buf(),
            size: metadata.len(),
            is_dir: metadata.is_dir(),
        })
    }

    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Open a regular file for reading. Returns the handle and its length.
    pub async fn open_read(&self, path: &Path) -> Result<(fs::File, u64)> {
        let info = self.stat(path).await?;
        if info.is_dir {
            return Err(TransferError::IsDirectory { path: path.to_path_buf() });
        }
        let file = fs::File::open(path)
            .await
            .map_err(|e| TransferError::from_io(path, e))?;
        Ok((file, info.size))
    }

    /// Create or truncate a file for writing. The parent directory must exist.
    pub async fn create(&self, path: &Path) -> Result<fs::File> {
        if let Ok(metadata) = fs::metadata(path).await {
            if metadata.is_dir() {
                return Err(TransferError::IsDirectory { path: path.to_path_buf() });
            }
        }
        fs::File::create(path)
            .await
            .map_err(|e| TransferError::from_io(path, e))
    }
}
