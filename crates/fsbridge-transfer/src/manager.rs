//! Job submission and control.
//!
//! `TransferManager` validates a host request, registers the job, spawns the
//! matching engine on the runtime and hands back a [`JobHandle`]. Submission
//! never waits on the network or the disk.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use fsbridge_types::{Direction, DownloadOptions, DownloadResult, JobId, UploadOptions, UploadResult};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc;

use crate::completion;
use crate::config::TransferConfig;
use crate::download::{self, DownloadSpec};
use crate::error::Result;
use crate::hash::{self, HashAlgorithm};
use crate::http;
use crate::job::{EventSink, JobContext, JobHandle};
use crate::logging::{JobEvent, TracingLogger, TransferLogger};
use crate::mime::{ExtensionTable, MimeResolver};
use crate::registry::JobRegistry;
use crate::storage::LocalStorage;
use crate::upload::{self, UploadSpec};

pub struct TransferManager {
    config: TransferConfig,
    registry: Arc<JobRegistry>,
    storage: LocalStorage,
    mime: Arc<dyn MimeResolver>,
    logger: Arc<dyn TransferLogger>,
    runtime: Handle,
}

impl Default for TransferManager {
    fn default() -> Self {
        Self::new(TransferConfig::default())
    }
}

impl TransferManager {
    /// Jobs run on the current tokio runtime if there is one, otherwise on a
    /// shared background runtime.
    pub fn new(config: TransferConfig) -> Self {
        Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            storage: LocalStorage::new(),
            mime: Arc::new(ExtensionTable),
            logger: Arc::new(TracingLogger),
            runtime: runtime_handle(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn TransferLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_mime_resolver(mut self, resolver: Arc<dyn MimeResolver>) -> Self {
        self.mime = resolver;
        self
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Start a download. Fails immediately on invalid options or an id that
    /// is still in use; everything after that arrives through the handle.
    pub fn download(&self, job_id: JobId, options: DownloadOptions) -> Result<JobHandle<DownloadResult>> {
        let spec = DownloadSpec::from_options(&options, &self.config)?;
        let client = http::build_client(&self.config, spec.connect_timeout, spec.read_timeout)?;
        let target = spec.url.to_string();

        self.submit(
            job_id,
            Direction::Download,
            target,
            EventFlags::new(options.has_begin_callback, options.has_progress_callback),
            move |ctx| async move { download::run(&ctx, &client, spec).await },
        )
    }

    /// Start an upload. Source files are opened by the job, so a missing
    /// file shows up as the job's failure rather than here.
    pub fn upload(&self, job_id: JobId, options: UploadOptions) -> Result<JobHandle<UploadResult>> {
        let spec = UploadSpec::from_options(&options, &self.config, self.mime.as_ref())?;
        // Uploads only get the client's own timeouts.
        let client = http::build_client(&self.config, None, None)?;
        let target = format!("{} {}", spec.method, spec.url);

        self.submit(
            job_id,
            Direction::Upload,
            target,
            EventFlags::new(options.has_begin_callback, options.has_progress_callback),
            move |ctx| async move { upload::run(&ctx, &client, spec).await },
        )
    }

    fn submit<T, F, Fut>(
        &self,
        job_id: JobId,
        direction: Direction,
        target: String,
        flags: EventFlags,
        work: F,
    ) -> Result<JobHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(Arc<JobContext>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let registration = self.registry.register(job_id, direction)?;
        let token = registration.token().clone();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (reporter, outcome) = completion::channel(job_id);

        let ctx = Arc::new(JobContext {
            job_id,
            direction,
            token: token.clone(),
            events: EventSink::new(events_tx, flags.begin, flags.progress),
            storage: self.storage.clone(),
            logger: Arc::clone(&self.logger),
        });
        ctx.log(JobEvent::Submitted { direction, target });

        let job = work(Arc::clone(&ctx));
        self.runtime.spawn(async move {
            let outcome = job.await;
            if let Err(err) = &outcome {
                if !err.is_aborted() {
                    ctx.log(JobEvent::Failed { message: err.to_string() });
                }
            }
            // Unregister first so the id is free by the time the caller hears back.
            drop(registration);
            reporter.finish(outcome);
        });

        Ok(JobHandle::new(job_id, direction, token, events_rx, outcome))
    }

    /// Abort a running download. Unknown ids and uploads are ignored.
    pub fn stop_download(&self, job_id: JobId) -> bool {
        self.registry.cancel_direction(job_id, Direction::Download)
    }

    /// Abort a running upload. Unknown ids and downloads are ignored.
    pub fn stop_upload(&self, job_id: JobId) -> bool {
        self.registry.cancel_direction(job_id, Direction::Upload)
    }

    pub fn stop(&self, job_id: JobId) -> bool {
        self.registry.cancel(job_id)
    }

    /// Abort every active job. Returns how many were signalled.
    pub fn stop_all(&self) -> usize {
        self.registry.cancel_all()
    }

    /// Jobs submitted and not yet finished.
    pub fn pending_jobs(&self) -> usize {
        self.registry.pending_count()
    }

    pub fn is_active(&self, job_id: JobId) -> bool {
        self.registry.contains(job_id)
    }

    pub async fn hash(&self, path: impl AsRef<Path>, algorithm: HashAlgorithm) -> Result<String> {
        hash::hash_file(&self.storage, path.as_ref(), algorithm).await
    }
}

#[derive(Debug, Clone, Copy)]
struct EventFlags {
    begin: bool,
    progress: bool,
}

impl EventFlags {
    fn new(begin: bool, progress: bool) -> Self {
        Self { begin, progress }
    }
}

fn runtime_handle() -> Handle {
    Handle::try_current().unwrap_or_else(|_| get_or_create_runtime().handle().clone())
}

fn get_or_create_runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        Builder::new_multi_thread()
            .enable_all()
            .thread_name("fsbridge-transfer")
            .build()
            .expect("Failed to create Tokio runtime")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;
    use crate::logging::NullLogger;
    use fsbridge_types::{FailureCode, UploadFileItem};

    fn manager() -> TransferManager {
        TransferManager::default().with_logger(Arc::new(NullLogger))
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_at_submission() {
        let manager = manager();
        let err = manager
            .download(JobId(1), DownloadOptions::new("gopher://example.com", "/tmp/x"))
            .err()
            .unwrap();
        assert_eq!(err.code(), FailureCode::InvalidConfig);
        assert_eq!(manager.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn test_missing_upload_source_fails_job() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager();
        let options = UploadOptions::new(
            // Never contacted: the file check comes first.
            "http://127.0.0.1:9/upload",
            vec![UploadFileItem::new("file", "gone.bin", dir.path().join("gone.bin"))],
        );

        let handle = manager.upload(JobId(2), options).unwrap();
        let err = handle.wait().await.unwrap_err();
        assert_eq!(err.code(), FailureCode::NotFound);
        assert_eq!(manager.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn test_stop_unknown_job_is_noop() {
        let manager = manager();
        assert!(!manager.stop(JobId(77)));
        assert!(!manager.stop_download(JobId(77)));
        assert_eq!(manager.stop_all(), 0);
    }

    #[tokio::test]
    async fn test_stopped_before_start_reports_aborted() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager();
        let handle = manager
            .download(JobId(3), DownloadOptions::new("http://127.0.0.1:9/file", dir.path().join("out")))
            .unwrap();
        handle.cancel();

        let (events, outcome) = handle.wait_with_events().await;
        assert!(events.is_empty());
        assert!(matches!(outcome, Err(TransferError::Aborted(Direction::Download))));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_works_without_ambient_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager();
        let handle = manager
            .download(JobId(4), DownloadOptions::new("http://127.0.0.1:9/file", dir.path().join("out")))
            .unwrap();
        handle.cancel();

        // The worker may get as far as a refused connection before it sees the stop.
        let err = get_or_create_runtime().block_on(handle.wait()).unwrap_err();
        assert!(matches!(err.code(), FailureCode::Aborted | FailureCode::Transport));
        assert_eq!(manager.pending_jobs(), 0);
    }
}
