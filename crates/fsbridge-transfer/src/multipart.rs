//! Request body layout for uploads.
//!
//! A [`BodyPlan`] is the ordered list of envelope bytes and file slots that
//! make up one request body. Its length is known before any file byte is
//! read, which is what lets the upload engine send a fixed `Content-Length`
//! while streaming.
//!
//! Multipart layout (boundary `B`):
//!
//! ```text
//! --B\r\n
//! Content-Disposition: form-data; name="field"\r\n
//! \r\n
//! value\r\n
//! --B\r\n
//! Content-Disposition: form-data; name="file"; filename="a.txt"\r\n
//! Content-Type: text/plain\r\n
//! \r\n
//! <file bytes>\r\n
//! --B--\r\n
//! ```

use std::path::PathBuf;

use bytes::Bytes;
use fsbridge_types::Headers;

pub const BOUNDARY: &str = "----fsbridge7MA4YWxkTrZu0gW";
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data; boundary=----fsbridge7MA4YWxkTrZu0gW";

/// A local file whose size has already been taken.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub field_name: String,
    pub filename: String,
    pub content_type: String,
    pub path: PathBuf,
    pub size: u64,
    /// Read size used when streaming this file
    pub chunk_size: usize,
}

#[derive(Debug, Clone)]
pub enum Segment {
    /// Boundary lines, part headers, field values
    Envelope(Bytes),
    /// Index into [`BodyPlan::files`]
    File(usize),
}

#[derive(Debug, Clone)]
pub struct BodyPlan {
    segments: Vec<Segment>,
    files: Vec<PlannedFile>,
    multipart: bool,
}

impl BodyPlan {
    /// Field parts first, then one part per file in order, then the closing
    /// boundary.
    pub fn multipart(fields: &Headers, files: Vec<PlannedFile>) -> Self {
        let mut segments = Vec::with_capacity(fields.len() + files.len() * 2 + 1);

        for (name, value) in fields {
            segments.push(Segment::Envelope(Bytes::from(field_part(name, value))));
        }
        for (index, file) in files.iter().enumerate() {
            segments.push(Segment::Envelope(Bytes::from(file_part_header(file))));
            segments.push(Segment::File(index));
            segments.push(Segment::Envelope(Bytes::from_static(b"\r\n")));
        }
        segments.push(Segment::Envelope(Bytes::from(format!("--{}--\r\n", BOUNDARY))));

        Self { segments, files, multipart: true }
    }

    /// File contents back to back, nothing else.
    pub fn raw(files: Vec<PlannedFile>) -> Self {
        let segments = (0..files.len()).map(Segment::File).collect();
        Self { segments, files, multipart: false }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn files(&self) -> &[PlannedFile] {
        &self.files
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart
    }

    /// `Content-Type` the body requires, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        self.multipart.then_some(MULTIPART_CONTENT_TYPE)
    }

    /// Exact number of bytes the body will produce.
    pub fn content_length(&self) -> u64 {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Envelope(bytes) => bytes.len() as u64,
                Segment::File(index) => self.files[*index].size,
            })
            .sum()
    }

    pub fn into_parts(self) -> (Vec<Segment>, Vec<PlannedFile>) {
        (self.segments, self.files)
    }
}

fn field_part(name: &str, value: &str) -> String {
    format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
        BOUNDARY,
        escape_quoted(name),
        value
    )
}

fn file_part_header(file: &PlannedFile) -> String {
    format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        BOUNDARY,
        escape_quoted(&file.field_name),
        escape_quoted(&file.filename),
        file.content_type
    )
}

/// Quoted header parameter values cannot hold quotes or line breaks.
fn escape_quoted(value: &str) -> String {
    value.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}
