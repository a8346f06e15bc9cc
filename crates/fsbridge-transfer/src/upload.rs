//! Upload engine: local files (and form fields) to one HTTP request.
//!
//! Every source file is opened and measured before connecting, so missing
//! files fail the job without touching the network and the body length is
//! known up front. The body is then streamed file by file in chunks sized by
//! [`ChunkSizer`]; nothing is buffered whole.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use fsbridge_types::{Direction, JobId, UploadOptions, UploadResult, TransferEvent};
use futures_util::Stream;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Body, Client, Method, Url};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::buffer::ChunkSizer;
use crate::config::TransferConfig;
use crate::download::parse_http_url;
use crate::error::{Result, TransferError};
use crate::http;
use crate::job::{EventSink, JobContext, component};
use crate::logging::{JobEvent, JobLog, TransferLogger};
use crate::mime::{MimeResolver, content_type_for};
use crate::multipart::{BodyPlan, PlannedFile, Segment};

/// One file as it will be sent.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub field_name: String,
    pub filename: String,
    pub content_type: String,
    pub path: PathBuf,
}

/// Validated, immutable description of one upload.
#[derive(Debug, Clone)]
pub struct UploadSpec {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub fields: fsbridge_types::Headers,
    pub files: Vec<FileSource>,
    pub binary_stream_only: bool,
    pub chunk_sizer: ChunkSizer,
}

impl UploadSpec {
    pub fn from_options(
        options: &UploadOptions,
        config: &TransferConfig,
        resolver: &dyn MimeResolver,
    ) -> Result<Self> {
        let url = parse_http_url(&options.to_url)?;
        let method = parse_method(options.method.as_deref())?;

        let files = options
            .files
            .iter()
            .map(|item| {
                if item.filepath.as_os_str().is_empty() {
                    return Err(TransferError::invalid(format!(
                        "file {:?} has no local path",
                        item.filename
                    )));
                }
                Ok(FileSource {
                    field_name: item.field_name().to_string(),
                    filename: item.filename.clone(),
                    content_type: content_type_for(
                        resolver,
                        item.filetype.as_deref(),
                        &item.filepath,
                        &item.filename,
                    ),
                    path: item.filepath.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            url,
            method,
            headers: http::to_header_map(&options.headers)?,
            fields: options.fields.clone(),
            files,
            binary_stream_only: options.binary_stream_only,
            chunk_sizer: ChunkSizer::new(config.upload_min_chunk_size, config.upload_memory_divisor),
        })
    }
}

/// Absent or blank means POST. Verbs are case-insensitive.
fn parse_method(raw: Option<&str>) -> Result<Method> {
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(Method::POST),
        Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| TransferError::invalid(format!("invalid HTTP method: {:?}", method))),
    }
}

pub async fn run(ctx: &JobContext, client: &Client, spec: UploadSpec) -> Result<UploadResult> {
    let started = Instant::now();
    ctx.check_abort()?;

    let mut handles = Vec::with_capacity(spec.files.len());
    let mut planned = Vec::with_capacity(spec.files.len());
    for source in &spec.files {
        let (file, size) = ctx.storage.open_read(&source.path).await?;
        planned.push(PlannedFile {
            field_name: source.field_name.clone(),
            filename: source.filename.clone(),
            content_type: source.content_type.clone(),
            path: source.path.clone(),
            size,
            chunk_size: spec.chunk_sizer.chunk_size_for(size),
        });
        handles.push(file);
    }

    let plan = if spec.binary_stream_only {
        BodyPlan::raw(planned)
    } else {
        BodyPlan::multipart(&spec.fields, planned)
    };
    let total = plan.content_length();
    ctx.log(JobEvent::RequestPlanned {
        content_length: total,
        files: plan.files().len(),
        multipart: plan.is_multipart(),
    });

    let mut headers = spec.headers.clone();
    headers.insert(CONTENT_LENGTH, HeaderValue::from(total));
    if let Some(content_type) = plan.content_type() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    let feed = BodyFeed {
        job_id: ctx.job_id,
        token: ctx.token.clone(),
        events: ctx.events.clone(),
        logger: Arc::clone(&ctx.logger),
        total,
        sent: Arc::new(AtomicU64::new(0)),
        failure: Arc::new(Mutex::new(None)),
    };
    let sent = Arc::clone(&feed.sent);
    let failure = Arc::clone(&feed.failure);

    let request = client
        .request(spec.method.clone(), spec.url.clone())
        .headers(headers)
        .body(Body::wrap_stream(body_stream(plan, handles, feed)));

    ctx.events.emit(TransferEvent::UploadBegin { job_id: ctx.job_id });

    let response = tokio::select! {
        biased;
        _ = ctx.token.cancelled() => return Err(ctx.aborted(sent.load(Ordering::Relaxed))),
        response = request.send() => response,
    };
    let response = match response {
        Ok(response) => response,
        // The body stream's own error is more useful than hyper's wrapper.
        Err(err) => {
            return Err(match take_failure(&failure) {
                Some(cause) if cause.is_aborted() => ctx.aborted(sent.load(Ordering::Relaxed)),
                Some(cause) => cause,
                None => TransferError::Http(err),
            });
        }
    };

    let status = response.status();
    let response_headers = http::joined_values(response.headers());
    let body = tokio::select! {
        biased;
        _ = ctx.token.cancelled() => return Err(ctx.aborted(sent.load(Ordering::Relaxed))),
        body = response.text() => body?,
    };

    ctx.log(JobEvent::Completed {
        status: status.as_u16(),
        bytes: sent.load(Ordering::Relaxed),
        duration_ms: started.elapsed().as_millis() as u64,
    });

    Ok(UploadResult {
        job_id: ctx.job_id,
        status_code: status.as_u16(),
        headers: response_headers,
        body,
    })
}

fn take_failure(slot: &Mutex<Option<TransferError>>) -> Option<TransferError> {
    slot.lock().ok().and_then(|mut failure| failure.take())
}

/// State the body stream carries away from the job context.
struct BodyFeed {
    job_id: JobId,
    token: CancellationToken,
    events: EventSink,
    logger: Arc<dyn TransferLogger>,
    total: u64,
    sent: Arc<AtomicU64>,
    failure: Arc<Mutex<Option<TransferError>>>,
}

impl BodyFeed {
    /// Whether a chunk of `size` bytes ends the body. The stream is not polled
    /// again after the last byte of a fixed-length body, so that chunk has to
    /// be counted before it is handed over. Every other chunk is counted once
    /// the connection asks for the next one.
    fn completes_body(&self, size: usize) -> bool {
        self.sent.load(Ordering::Relaxed) + size as u64 >= self.total
    }

    /// Count a chunk and report it.
    fn advance(&self, size: usize) {
        let sent = self.sent.fetch_add(size as u64, Ordering::Relaxed) + size as u64;
        self.logger.log(JobLog::new(
            component(Direction::Upload),
            self.job_id,
            JobEvent::ChunkMoved { size, total: sent },
        ));
        self.events.emit(TransferEvent::UploadProgress {
            job_id: self.job_id,
            total_bytes_expected_to_send: self.total,
            total_bytes_sent: sent,
        });
    }

    /// Keep the typed error for the engine; the connection only gets text.
    fn fail(&self, err: TransferError) -> io::Error {
        let io_err = io::Error::other(err.to_string());
        if let Ok(mut slot) = self.failure.lock() {
            slot.get_or_insert(err);
        }
        io_err
    }
}

fn size_changed(path: &Path) -> TransferError {
    TransferError::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{} changed size while uploading", path.display()),
    ))
}

fn body_stream(
    plan: BodyPlan,
    mut handles: Vec<fs::File>,
    feed: BodyFeed,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    async_stream::stream! {
        let (segments, files) = plan.into_parts();

        for segment in segments {
            if feed.token.is_cancelled() {
                yield Err(feed.fail(TransferError::Aborted(Direction::Upload)));
                return;
            }

            match segment {
                Segment::Envelope(bytes) => {
                    let size = bytes.len();
                    let last = feed.completes_body(size);
                    if last {
                        feed.advance(size);
                    }
                    yield Ok(bytes);
                    if !last {
                        feed.advance(size);
                    }
                }
                Segment::File(index) => {
                    let planned = &files[index];
                    let file = &mut handles[index];
                    let mut buf = vec![0u8; planned.chunk_size.max(1)];
                    let mut remaining = planned.size;

                    while remaining > 0 {
                        if feed.token.is_cancelled() {
                            yield Err(feed.fail(TransferError::Aborted(Direction::Upload)));
                            return;
                        }

                        let want = remaining.min(buf.len() as u64) as usize;
                        let n = match file.read(&mut buf[..want]).await {
                            Ok(0) => {
                                yield Err(feed.fail(size_changed(&planned.path)));
                                return;
                            }
                            Ok(n) => n,
                            Err(e) => {
                                yield Err(feed.fail(TransferError::from_io(&planned.path, e)));
                                return;
                            }
                        };
                        remaining -= n as u64;

                        // A file that grew would push the body past Content-Length.
                        if remaining == 0 {
                            match file.metadata().await {
                                Ok(meta) if meta.len() == planned.size => {}
                                Ok(_) => {
                                    yield Err(feed.fail(size_changed(&planned.path)));
                                    return;
                                }
                                Err(e) => {
                                    yield Err(feed.fail(TransferError::from_io(&planned.path, e)));
                                    return;
                                }
                            }
                        }

                        let last = feed.completes_body(n);
                        if last {
                            feed.advance(n);
                        }
                        yield Ok(Bytes::copy_from_slice(&buf[..n]));
                        if !last {
                            feed.advance(n);
                        }
                    }
                }
            }
        }
    }
}
