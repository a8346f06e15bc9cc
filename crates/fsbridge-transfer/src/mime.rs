//! Filename extension → content type lookup for multipart file parts.

use std::path::Path;

/// Sent when nothing better is known.
pub const FALLBACK_CONTENT_TYPE: &str = "*/*";

/// Maps a filename extension to a MIME type. Hosts with a platform lookup
/// can plug theirs in; [`ExtensionTable`] covers the common cases.
pub trait MimeResolver: Send + Sync {
    /// `extension` is lowercase and has no leading dot.
    fn lookup(&self, extension: &str) -> Option<String>;
}

/// Built-in table of common extensions.
pub struct ExtensionTable;

const TABLE: &[(&str, &str)] = &[
    ("aac", "audio/aac"),
    ("avi", "video/x-msvideo"),
    ("bin", "application/octet-stream"),
    ("bmp", "image/bmp"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("heic", "image/heic"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("m4a", "audio/mp4"),
    ("md", "text/markdown"),
    ("mov", "video/quicktime"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("oga", "audio/ogg"),
    ("ogg", "audio/ogg"),
    ("ogv", "video/ogg"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("txt", "text/plain"),
    ("wav", "audio/wav"),
    ("weba", "audio/webm"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

impl MimeResolver for ExtensionTable {
    fn lookup(&self, extension: &str) -> Option<String> {
        TABLE
            .binary_search_by(|(ext, _)| (*ext).cmp(extension))
            .ok()
            .map(|idx| TABLE[idx].1.to_string())
    }
}

/// Content type for a file part: explicit value, then the local path's
/// extension, then the filename's, then [`FALLBACK_CONTENT_TYPE`].
pub fn content_type_for(
    resolver: &dyn MimeResolver,
    explicit: Option<&str>,
    filepath: &Path,
    filename: &str,
) -> String {
    if let Some(explicit) = explicit.filter(|s| !s.trim().is_empty()) {
        return explicit.to_string();
    }
    [filepath, Path::new(filename)]
        .into_iter()
        .filter_map(|path| path.extension().and_then(|ext| ext.to_str()))
        .find_map(|ext| resolver.lookup(&ext.to_ascii_lowercase()))
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}
