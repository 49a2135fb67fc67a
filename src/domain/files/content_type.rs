pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Maps a file name's extension to a MIME type. Unknown or missing
/// extensions fall back to `application/octet-stream`.
pub fn resolve(name: &str) -> &'static str {
    let Some(ext) = extension(name) else {
        return DEFAULT_CONTENT_TYPE;
    };
    match ext.to_ascii_lowercase().as_str() {
        "txt" => "text/plain",
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

// suffix after the last '.' of the final path segment
fn extension(name: &str) -> Option<&str> {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.rfind('.').map(|idx| &base[idx + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(resolve("a.json"), "application/json");
        assert_eq!(resolve("report.txt"), "text/plain");
        assert_eq!(resolve("photos/cat.JPEG"), "image/jpeg");
        assert_eq!(resolve("bundle.tar.gz"), "application/gzip");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back() {
        assert_eq!(resolve("a.unknownext"), DEFAULT_CONTENT_TYPE);
        assert_eq!(resolve("noext"), DEFAULT_CONTENT_TYPE);
        assert_eq!(resolve("dir.d/noext"), DEFAULT_CONTENT_TYPE);
        assert_eq!(resolve("trailing."), DEFAULT_CONTENT_TYPE);
    }
}
