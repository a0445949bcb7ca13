//! Content type lookup by file extension.

use std::path::Path;

/// Guess a content type from the file extension (case-insensitive).
///
/// Returns `None` for unknown or missing extensions; the object is then
/// uploaded without a content type and the provider picks its default.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();

    let content_type = match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/vnd.microsoft.icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => return None,
    };

    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type_for(Path::new("/site/index.html")), Some("text/html"));
        assert_eq!(content_type_for(Path::new("app.JS")), Some("application/javascript"));
        assert_eq!(content_type_for(Path::new("logo.svg")), Some("image/svg+xml"));
        assert_eq!(content_type_for(Path::new("f.woff2")), Some("font/woff2"));
    }

    #[test]
    fn test_unknown_or_missing_extension() {
        assert_eq!(content_type_for(Path::new("LICENSE")), None);
        assert_eq!(content_type_for(Path::new("archive.xyz")), None);
        assert_eq!(content_type_for(Path::new(".sync")), None);
    }
}
