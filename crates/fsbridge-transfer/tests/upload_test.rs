/// Integration tests: multipart and raw uploads against a local HTTP server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{pattern, progress_of, spawn_server, write_file};
use fsbridge_transfer::types::{FailureCode, JobId, TransferEvent, UploadFileItem, UploadOptions};
use fsbridge_transfer::{BOUNDARY, NullLogger, TransferConfig, TransferManager};
use serde_json::Value;

fn manager() -> TransferManager {
    TransferManager::new(TransferConfig::default()).with_logger(Arc::new(NullLogger))
}

#[tokio::test]
async fn multipart_fields_then_files_in_order() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(dir.path(), "notes.txt", b"first file");
    let second = write_file(dir.path(), "blob.dat", &pattern(3000));
    let manager = manager();

    let mut typed = UploadFileItem::new("attachment", "blob.dat", &second);
    typed.filetype = Some("application/x-blob".into());
    let mut options = UploadOptions::new(
        server.url("/multipart"),
        vec![UploadFileItem::new("document", "notes.txt", &first), typed],
    );
    options.fields.insert("album".into(), "summer".into());

    let (events, outcome) = manager.upload(JobId(1), options).unwrap().wait_with_events().await;
    let result = outcome.unwrap();
    assert_eq!(result.status_code, 200);

    let summary: Value = serde_json::from_str(&result.body).unwrap();
    assert_eq!(
        summary["contentType"],
        format!("multipart/form-data; boundary={}", BOUNDARY)
    );
    let parts = summary["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);

    assert_eq!(parts[0]["name"], "album");
    assert!(parts[0]["filename"].is_null());
    assert_eq!(parts[0]["text"], "summer");

    assert_eq!(parts[1]["name"], "document");
    assert_eq!(parts[1]["filename"], "notes.txt");
    assert_eq!(parts[1]["contentType"], "text/plain");
    assert_eq!(parts[1]["text"], "first file");

    assert_eq!(parts[2]["name"], "attachment");
    assert_eq!(parts[2]["filename"], "blob.dat");
    assert_eq!(parts[2]["contentType"], "application/x-blob");
    assert_eq!(parts[2]["size"], 3000);

    assert!(matches!(events[0], TransferEvent::UploadBegin { job_id: JobId(1) }));
    let progress = progress_of(&events);
    let (total, sent) = *progress.last().unwrap();
    assert_eq!(Some(sent), total);
    assert!(progress.windows(2).all(|pair| pair[0].1 < pair[1].1));
}

#[tokio::test]
async fn declared_length_matches_bytes_sent() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "photo.jpg", &pattern(150_000));
    let manager = manager();

    let mut options = UploadOptions::new(server.url("/capture"), vec![UploadFileItem::new("photo", "photo.jpg", &path)]);
    options.fields.insert("caption".into(), "beach".into());

    let (events, outcome) = manager.upload(JobId(2), options).unwrap().wait_with_events().await;
    let result = outcome.unwrap();

    let declared: u64 = result.headers["x-content-length"].parse().unwrap();
    let received: u64 = result.headers["x-received-length"].parse().unwrap();
    assert_eq!(declared, received);
    assert_eq!(progress_of(&events).last().unwrap(), &(Some(declared), declared));
    assert!(result.body.starts_with(&format!("--{}\r\n", BOUNDARY)));
    assert!(result.body.ends_with(&format!("--{}--\r\n", BOUNDARY)));
}

#[tokio::test]
async fn raw_mode_concatenates_files() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.txt", b"hello ");
    let b = write_file(dir.path(), "b.txt", b"world");
    let manager = manager();

    let mut options = UploadOptions::new(
        server.url("/capture"),
        vec![UploadFileItem::new("a", "a.txt", &a), UploadFileItem::new("b", "b.txt", &b)],
    );
    options.binary_stream_only = true;
    options.method = Some("put".into());
    options.fields.insert("ignored".into(), "in raw mode".into());

    let result = manager.upload(JobId(3), options).unwrap().wait().await.unwrap();
    assert_eq!(result.status_code, 200);
    assert_eq!(result.body, "hello world");
    assert_eq!(result.headers["x-method"], "PUT");
    assert_eq!(result.headers["x-content-length"], "11");
    assert_eq!(result.headers["x-multi"], "a, b");
}

#[tokio::test]
async fn error_status_is_a_result() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "big.bin", &pattern(2048));
    let manager = manager();

    let options = UploadOptions::new(server.url("/reject"), vec![UploadFileItem::new("f", "big.bin", &path)]);
    let result = manager.upload(JobId(4), options).unwrap().wait().await.unwrap();
    assert_eq!(result.status_code, 413);
    assert_eq!(result.body, "too big");
    assert!(!result.is_success());
}

#[tokio::test]
async fn missing_and_directory_sources_fail() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager();

    let options = UploadOptions::new(
        server.url("/capture"),
        vec![UploadFileItem::new("f", "gone.bin", dir.path().join("gone.bin"))],
    );
    let (events, outcome) = manager.upload(JobId(5), options).unwrap().wait_with_events().await;
    let failure = outcome.unwrap_err().to_failure(JobId(5));
    assert_eq!(failure.code, FailureCode::NotFound);
    assert!(failure.message.starts_with("ENOENT"));
    assert!(events.is_empty());

    let options = UploadOptions::new(server.url("/capture"), vec![UploadFileItem::new("f", "dir", dir.path())]);
    let err = manager.upload(JobId(6), options).unwrap().wait().await.unwrap_err();
    assert_eq!(err.code(), FailureCode::IsDirectory);
}

#[tokio::test]
async fn stop_before_first_chunk() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "never.bin", &pattern(4096));
    let manager = manager();

    let options = UploadOptions::new(server.url("/capture"), vec![UploadFileItem::new("f", "never.bin", &path)]);
    let handle = manager.upload(JobId(8), options).unwrap();
    // The job has not been polled yet on this single-threaded runtime.
    assert!(manager.stop_upload(JobId(8)));

    let (events, outcome) = handle.wait_with_events().await;
    let err = outcome.unwrap_err();
    assert_eq!(err.code(), FailureCode::Aborted);
    assert_eq!(err.to_string(), "upload has been aborted");
    assert!(progress_of(&events).is_empty());
    assert_eq!(manager.pending_jobs(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_mid_upload() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let total = 16 * 1024 * 1024;
    let path = write_file(dir.path(), "large.bin", &pattern(total));
    let manager = manager();

    let mut options = UploadOptions::new(server.url("/slow-sink"), vec![UploadFileItem::new("f", "large.bin", &path)]);
    options.binary_stream_only = true;
    let mut handle = manager.upload(JobId(7), options).unwrap();

    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), handle.next_event())
            .await
            .unwrap()
            .expect("job ended before reaching the stop point");
        if event.progress().is_some_and(|(_, sent)| sent >= 512 * 1024) {
            break;
        }
    }
    assert!(!manager.stop_download(JobId(7)));
    assert!(manager.stop_upload(JobId(7)));

    let (_, outcome) = handle.wait_with_events().await;
    let err = outcome.unwrap_err();
    assert_eq!(err.code(), FailureCode::Aborted);
    assert_eq!(err.to_string(), "upload has been aborted");
    assert_eq!(manager.pending_jobs(), 0);
}
