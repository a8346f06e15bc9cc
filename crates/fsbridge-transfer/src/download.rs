//! Download engine: one GET from a remote resource into a local file.
//!
//! 1. Connect with the job's headers and timeouts
//! 2. Follow up to `max_redirects` 301/302/307/308 hops by hand
//! 3. Non-2xx: report the status with zero bytes, leave the destination alone
//! 4. 2xx: emit Begin, then copy the body in fixed-size chunks, polling the
//!    abort signal and the throttle after every chunk
//!
//! An abort leaves whatever was already written in place.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use fsbridge_types::{DownloadOptions, DownloadResult, TransferEvent};
use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, Url};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

use crate::config::{TransferConfig, timeout_from_millis};
use crate::error::{Result, TransferError};
use crate::http;
use crate::job::JobContext;
use crate::logging::JobEvent;
use crate::throttle::{ProgressThrottle, ThrottleStrategy};

/// Validated, immutable description of one download.
#[derive(Debug, Clone)]
pub struct DownloadSpec {
    pub url: Url,
    pub destination: PathBuf,
    pub headers: HeaderMap,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub throttle: ThrottleStrategy,
    pub max_redirects: u8,
    pub chunk_size: usize,
}

impl DownloadSpec {
    /// Check host options and fill the gaps from `config`. Nothing here
    /// touches the network or the disk.
    pub fn from_options(options: &DownloadOptions, config: &TransferConfig) -> Result<Self> {
        let url = parse_http_url(&options.from_url)?;
        if options.to_file.as_os_str().is_empty() {
            return Err(TransferError::invalid("download destination is empty"));
        }

        Ok(Self {
            url,
            destination: options.to_file.clone(),
            headers: http::to_header_map(&options.headers)?,
            connect_timeout: options
                .connection_timeout
                .map_or(config.connect_timeout, timeout_from_millis),
            read_timeout: options.read_timeout.map_or(config.read_timeout, timeout_from_millis),
            throttle: ThrottleStrategy::from_settings(options.progress_interval, options.progress_divider),
            max_redirects: options.max_redirects.unwrap_or(config.max_redirects),
            chunk_size: config.download_chunk_size.max(1),
        })
    }
}

pub(crate) fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| TransferError::invalid(format!("invalid url {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TransferError::invalid(format!("unsupported url scheme: {}", other))),
    }
}

pub async fn run(ctx: &JobContext, client: &Client, spec: DownloadSpec) -> Result<DownloadResult> {
    let started = Instant::now();
    ctx.check_abort()?;

    let mut url = spec.url.clone();
    let mut hops: u8 = 0;
    let response = loop {
        let request = client.get(url.clone()).headers(spec.headers.clone());
        let response = tokio::select! {
            biased;
            _ = ctx.token.cancelled() => return Err(ctx.aborted(0)),
            response = request.send() => response?,
        };

        let status = response.status();
        if !http::is_followed_redirect(status) || hops >= spec.max_redirects {
            break response;
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        // A redirect without a usable Location is the final answer.
        let Some(location) = location else {
            break response;
        };
        let next = url
            .join(&location)
            .map_err(|e| TransferError::invalid(format!("invalid redirect location {:?}: {}", location, e)))?;

        ctx.log(JobEvent::Redirected {
            status: status.as_u16(),
            location: next.to_string(),
        });
        url = next;
        hops += 1;
    };

    let status = response.status();
    let content_length = response.content_length();
    ctx.log(JobEvent::ResponseStarted {
        status: status.as_u16(),
        content_length,
    });

    if !status.is_success() {
        ctx.log(JobEvent::Completed {
            status: status.as_u16(),
            bytes: 0,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        return Ok(DownloadResult {
            job_id: ctx.job_id,
            status_code: status.as_u16(),
            bytes_written: 0,
        });
    }

    ctx.events.emit(TransferEvent::DownloadBegin {
        job_id: ctx.job_id,
        status_code: status.as_u16(),
        content_length,
        headers: http::first_values(response.headers()),
    });

    let mut file = ctx.storage.create(&spec.destination).await?;
    let mut body = std::pin::pin!(StreamReader::new(
        response.bytes_stream().map_err(io::Error::other)
    ));

    let mut throttle = ProgressThrottle::new(spec.throttle);
    let mut buf = vec![0u8; spec.chunk_size];
    let mut written: u64 = 0;

    loop {
        let n = tokio::select! {
            biased;
            _ = ctx.token.cancelled() => return Err(ctx.aborted(written)),
            read = body.read(&mut buf) => read?,
        };
        if n == 0 {
            break;
        }

        file.write_all(&buf[..n]).await?;
        written += n as u64;
        ctx.log(JobEvent::ChunkMoved { size: n, total: written });

        if ctx.is_aborted() {
            return Err(ctx.aborted(written));
        }
        if ctx.events.wants_progress() && throttle.should_emit(content_length, written) {
            ctx.events.emit(TransferEvent::DownloadProgress {
                job_id: ctx.job_id,
                content_length,
                bytes_written: written,
            });
        }
    }

    file.flush().await?;
    drop(file);

    ctx.log(JobEvent::Completed {
        status: status.as_u16(),
        bytes: written,
        duration_ms: started.elapsed().as_millis() as u64,
    });

    Ok(DownloadResult {
        job_id: ctx.job_id,
        status_code: status.as_u16(),
        bytes_written: written,
    })
}
