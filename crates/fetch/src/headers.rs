//! Header value helpers used when synthesizing a response.

/// Extract the media type from a Content-Type value, lowercased and without parameters
pub fn extract_mime_type(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim();
    if mime.is_empty() || !mime.contains('/') {
        return None;
    }
    Some(mime.to_ascii_lowercase())
}

/// Extract the `charset` parameter from a Content-Type value
pub fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Extract `filename=` from a Content-Disposition value
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Guess a MIME type from the extension of a path
pub fn mime_type_for_path(path: &str) -> Option<String> {
    let (_, extension) = path.rsplit_once('.')?;
    let mime = match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "xhtml" => "application/xhtml+xml",
        "txt" => "text/plain",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "text/xml",
        "wml" => "text/vnd.wap.wml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime.to_string())
}

/// Decode a raw header value as UTF-8, falling back to Latin-1
pub fn decode_header_bytes(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(value) => value.to_string(),
        Err(_) => raw.iter().map(|&b| b as char).collect(),
    }
}
