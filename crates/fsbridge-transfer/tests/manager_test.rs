/// Integration tests: job registration, stop requests and concurrent jobs.

mod common;

use std::sync::{Arc, Mutex};

use common::{SLOW_TOTAL, pattern, spawn_server, write_file};
use fsbridge_transfer::types::{DownloadOptions, FailureCode, JobId, UploadFileItem, UploadOptions};
use fsbridge_transfer::{HashAlgorithm, JobLog, NullLogger, TransferConfig, TransferLogger, TransferManager};

fn manager() -> TransferManager {
    TransferManager::new(TransferConfig::default()).with_logger(Arc::new(NullLogger))
}

#[derive(Default)]
struct RecordingLogger {
    entries: Mutex<Vec<String>>,
}

impl TransferLogger for RecordingLogger {
    fn log(&self, entry: JobLog) {
        self.entries
            .lock()
            .unwrap()
            .push(format!("{} {} {}", entry.component, entry.job_id, entry.event));
    }
}

#[tokio::test]
async fn registry_empties_after_completion() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager();

    let handle = manager
        .download(JobId(1), DownloadOptions::new(server.url("/file/4096"), dir.path().join("a.bin")))
        .unwrap();
    assert!(manager.is_active(JobId(1)));
    assert_eq!(manager.pending_jobs(), 1);

    handle.wait().await.unwrap();
    assert_eq!(manager.pending_jobs(), 0);
    assert!(!manager.is_active(JobId(1)));

    // The id is free again.
    let again = manager
        .download(JobId(1), DownloadOptions::new(server.url("/file/10"), dir.path().join("b.bin")))
        .unwrap();
    assert_eq!(again.wait().await.unwrap().bytes_written, 10);
}

#[tokio::test]
async fn duplicate_active_id_is_rejected() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let source = write_file(dir.path(), "up.bin", &pattern(100));
    let manager = manager();

    let running = manager
        .download(JobId(9), DownloadOptions::new(server.url("/slow"), dir.path().join("slow.bin")))
        .unwrap();

    let options = UploadOptions::new(server.url("/capture"), vec![UploadFileItem::new("f", "up.bin", &source)]);
    let err = manager.upload(JobId(9), options).err().unwrap();
    assert_eq!(err.code(), FailureCode::InvalidConfig);

    assert!(manager.stop(JobId(9)));
    assert!(running.wait().await.unwrap_err().is_aborted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_all_aborts_every_job() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager();

    let handles: Vec<_> = (1..=3)
        .map(|id| {
            manager
                .download(
                    JobId(id),
                    DownloadOptions::new(server.url("/slow"), dir.path().join(format!("{}.bin", id))),
                )
                .unwrap()
        })
        .collect();
    assert_eq!(manager.pending_jobs(), 3);
    assert_eq!(manager.stop_all(), 3);

    for handle in handles {
        let err = handle.wait().await.unwrap_err();
        assert_eq!(err.code(), FailureCode::Aborted);
    }
    assert_eq!(manager.pending_jobs(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_jobs_are_independent() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager();

    let slow = manager
        .download(JobId(1), DownloadOptions::new(server.url("/slow"), dir.path().join("slow.bin")))
        .unwrap();
    let quick = manager
        .download(JobId(2), DownloadOptions::new(server.url("/file/2048"), dir.path().join("quick.bin")))
        .unwrap();

    assert_eq!(quick.wait().await.unwrap().bytes_written, 2048);
    assert!(manager.is_active(JobId(1)));
    assert_eq!(slow.wait().await.unwrap().bytes_written, SLOW_TOTAL as u64);
}

#[tokio::test]
async fn lifecycle_is_logged() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let logger = Arc::new(RecordingLogger::default());
    let manager = TransferManager::default().with_logger(logger.clone());

    manager
        .download(JobId(5), DownloadOptions::new(server.url("/redirect/1"), dir.path().join("x.bin")))
        .unwrap()
        .wait()
        .await
        .unwrap();

    let entries = logger.entries.lock().unwrap().clone();
    assert!(entries[0].starts_with("downloader 5 submitted direction=download"));
    assert!(entries.iter().any(|e| e.contains("redirected status=302")));
    assert!(entries.iter().any(|e| e.contains("response_started status=200 content_length=1000")));
    assert!(entries.last().unwrap().contains("completed status=200 bytes=1000"));
}

#[tokio::test]
async fn hash_through_manager() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "abc.txt", b"abc");
    let manager = manager();

    let digest = manager.hash(&path, HashAlgorithm::Sha1).await.unwrap();
    assert_eq!(digest, "a9993e364706816aba3e25717850c26c9cd0d89d");

    let err = manager.hash(dir.path().join("none"), HashAlgorithm::Md5).await.unwrap_err();
    assert_eq!(err.code(), FailureCode::NotFound);
}
