//! Single-pass file digests.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use tokio::io::AsyncReadExt;

use crate::error::{Result, TransferError};
use crate::storage::LocalStorage;

const READ_BUFFER: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl FromStr for HashAlgorithm {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(TransferError::invalid(format!("Invalid hash algorithm: {}", s))),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

/// Lowercase hex digest of a regular file.
pub async fn hash_file(storage: &LocalStorage, path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let (file, _size) = storage.open_read(path).await?;
    match algorithm {
        HashAlgorithm::Md5 => digest_file::<Md5>(file).await,
        HashAlgorithm::Sha1 => digest_file::<Sha1>(file).await,
        HashAlgorithm::Sha224 => digest_file::<Sha224>(file).await,
        HashAlgorithm::Sha256 => digest_file::<Sha256>(file).await,
        HashAlgorithm::Sha384 => digest_file::<Sha384>(file).await,
        HashAlgorithm::Sha512 => digest_file::<Sha512>(file).await,
    }
}

async fn digest_file<D: Digest>(mut file: tokio::fs::File) -> Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
