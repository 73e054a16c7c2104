//! Outbound spoofing headers and inbound response header translation

use axum::http::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONNECTION, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE,
    ORIGIN, RANGE, REFERER, USER_AGENT,
};
use axum::http::{HeaderMap, HeaderValue};

use crate::resolver::MediaKind;

const CANONICAL_ORIGIN: &str = "https://www.youtube.com";

/// Headers sent with every upstream media fetch
pub fn spoof_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, HeaderValue::from_static(CANONICAL_ORIGIN));
    headers.insert(REFERER, HeaderValue::from_static("https://www.youtube.com/"));
    headers.insert(RANGE, HeaderValue::from_static("bytes=0-"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    if let Ok(ua) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, ua);
    }
    headers
}

pub fn default_content_type(kind: MediaKind) -> &'static str {
    match kind.for_relay() {
        MediaKind::Audio => "audio/mpeg",
        _ => "video/mp4",
    }
}

pub fn extension(kind: MediaKind) -> &'static str {
    match kind.for_relay() {
        MediaKind::Audio => "mp3",
        _ => "mp4",
    }
}

/// Keep ASCII alphanumerics, `_`, `-` and spaces; collapse whitespace.
/// Falls back to the content id, then to `download`.
pub fn sanitize_filename(title: Option<&str>, content_id: Option<&str>) -> String {
    let clean = |raw: &str| -> String {
        let kept: String = raw
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else if c.is_whitespace() {
                    ' '
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect();
        kept.split_whitespace().collect::<Vec<_>>().join(" ")
    };

    [title, content_id]
        .into_iter()
        .flatten()
        .map(clean)
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "download".to_string())
}

/// `<stem>.<ext>` for the given kind
pub fn filename_for(stem: &str, kind: MediaKind) -> String {
    format!("{stem}.{}", extension(kind))
}

/// Response headers for a relayed media body
pub fn relay_headers(upstream: &HeaderMap, kind: MediaKind, filename: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let content_type = upstream
        .get(CONTENT_TYPE)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(default_content_type(kind)));
    headers.insert(CONTENT_TYPE, content_type);

    // Sanitized names are plain ASCII, so this cannot fail in practice
    if let Ok(disposition) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        headers.insert(CONTENT_DISPOSITION, disposition);
    }

    if let Some(length) = upstream.get(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, length.clone());
    }
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}

/// Headers for the generic same-origin proxy: type and length only
pub fn proxy_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let content_type = upstream
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(CONTENT_TYPE, content_type);
    if let Some(length) = upstream.get(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, length.clone());
    }
    headers
}
