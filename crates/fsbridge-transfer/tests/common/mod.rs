//! Shared fixtures: a local axum server with the endpoints the transfer
//! tests talk to, plus helpers for scratch files and event inspection.

#![allow(dead_code)]

use std::path::{Path as FsPath, PathBuf};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Path};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use fsbridge_transfer::types::TransferEvent;
use futures_util::StreamExt;
use serde_json::{Value, json};

pub const SLOW_CHUNK: usize = 64 * 1024;
pub const SLOW_CHUNKS: usize = 64;
pub const SLOW_TOTAL: usize = SLOW_CHUNK * SLOW_CHUNKS;

/// Deterministic file contents.
pub fn pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

pub struct TestServer {
    base: String,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

pub async fn spawn_server() -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    TestServer {
        base: format!("http://{}", addr),
    }
}

fn router() -> Router {
    Router::new()
        .route("/file/{size}", get(file))
        .route("/unknown-length/{size}", get(unknown_length))
        .route("/slow", get(slow))
        .route("/redirect/{hops}", get(redirect))
        .route("/missing", get(missing))
        .route("/multipart", post(multipart_summary))
        .route("/capture", any(capture))
        .route("/reject", post(reject))
        .route("/slow-sink", post(slow_sink))
}

async fn file(Path(size): Path<usize>) -> Vec<u8> {
    pattern(size)
}

/// Chunked response with no Content-Length.
async fn unknown_length(Path(size): Path<usize>) -> Response {
    let data = pattern(size);
    let stream = async_stream::stream! {
        for chunk in data.chunks(10_000) {
            yield Ok::<_, std::io::Error>(Bytes::copy_from_slice(chunk));
        }
    };
    Body::from_stream(stream).into_response()
}

/// `SLOW_TOTAL` bytes trickled out over roughly a second and a half.
async fn slow() -> Response {
    let stream = async_stream::stream! {
        let chunk = pattern(SLOW_CHUNK);
        for _ in 0..SLOW_CHUNKS {
            tokio::time::sleep(Duration::from_millis(20)).await;
            yield Ok::<_, std::io::Error>(Bytes::copy_from_slice(&chunk));
        }
    };
    ([(CONTENT_LENGTH, SLOW_TOTAL.to_string())], Body::from_stream(stream)).into_response()
}

/// `/redirect/0` is a 1000 byte file; every other hop count points at the
/// next lower one.
async fn redirect(Path(hops): Path<u32>) -> Response {
    if hops == 0 {
        return pattern(1000).into_response();
    }
    (StatusCode::FOUND, [(LOCATION, format!("/redirect/{}", hops - 1))]).into_response()
}

async fn missing() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "nope")
}

async fn multipart_summary(headers: HeaderMap, mut multipart: Multipart) -> Json<Value> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(str::to_owned);
        let filename = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field.bytes().await.unwrap();
        parts.push(json!({
            "name": name,
            "filename": filename,
            "contentType": content_type,
            "size": data.len(),
            "text": String::from_utf8_lossy(&data),
        }));
    }
    Json(json!({
        "contentType": headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        "parts": parts,
    }))
}

/// Echoes the request body and reports what arrived in `x-*` headers.
async fn capture(method: Method, headers: HeaderMap, body: Bytes) -> Response {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string();
    let mut response = (
        [
            ("x-method", method.to_string()),
            ("x-content-length", declared),
            ("x-received-length", body.len().to_string()),
        ],
        body,
    )
        .into_response();
    response.headers_mut().append("x-multi", HeaderValue::from_static("a"));
    response.headers_mut().append("x-multi", HeaderValue::from_static("b"));
    response
}

async fn reject(_body: Bytes) -> (StatusCode, &'static str) {
    (StatusCode::PAYLOAD_TOO_LARGE, "too big")
}

/// Reads the request body slowly so the client stays mid-upload.
async fn slow_sink(body: Body) -> String {
    let mut stream = body.into_data_stream();
    let mut received = 0usize;
    while let Some(Ok(chunk)) = stream.next().await {
        received += chunk.len();
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    received.to_string()
}

pub fn write_file(dir: &FsPath, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// `(total, transferred)` of every progress event, in order.
pub fn progress_of(events: &[TransferEvent]) -> Vec<(Option<u64>, u64)> {
    events.iter().filter_map(TransferEvent::progress).collect()
}
