//! Engine-wide defaults. Per-job options override the timeout and redirect
//! settings; everything else applies to every job a manager runs.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TransferError};

/// Download copy loop chunk size.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// `None` disables the timeout
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    /// Redirect hops a download follows before treating the response as terminal
    pub max_redirects: u8,
    pub download_chunk_size: usize,
    /// Smallest upload chunk, regardless of file size
    pub upload_min_chunk_size: usize,
    /// Upload chunks never exceed `available_memory / upload_memory_divisor`
    pub upload_memory_divisor: u64,
    pub user_agent: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_millis(5_000)),
            read_timeout: Some(Duration::from_millis(15_000)),
            max_redirects: 1,
            download_chunk_size: DOWNLOAD_CHUNK_SIZE,
            upload_min_chunk_size: 8 * 1024,
            upload_memory_divisor: 10,
            user_agent: None,
        }
    }
}

impl TransferConfig {
    /// Defaults overridden by `FSBRIDGE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(ms) = env_parse::<u64>("FSBRIDGE_CONNECT_TIMEOUT_MS")? {
            config.connect_timeout = timeout_from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("FSBRIDGE_READ_TIMEOUT_MS")? {
            config.read_timeout = timeout_from_millis(ms);
        }
        if let Some(hops) = env_parse::<u8>("FSBRIDGE_MAX_REDIRECTS")? {
            config.max_redirects = hops;
        }
        if let Some(size) = env_parse::<usize>("FSBRIDGE_DOWNLOAD_CHUNK_BYTES")? {
            if size == 0 {
                return Err(TransferError::invalid("FSBRIDGE_DOWNLOAD_CHUNK_BYTES must be positive"));
            }
            config.download_chunk_size = size;
        }
        if let Ok(agent) = std::env::var("FSBRIDGE_USER_AGENT") {
            if !agent.is_empty() {
                config.user_agent = Some(agent);
            }
        }

        Ok(config)
    }
}

/// Host timeouts are milliseconds where zero means "wait forever".
pub fn timeout_from_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| TransferError::invalid(format!("{} has an invalid value: {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}
