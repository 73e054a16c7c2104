use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::sync::LazyLock;
use std::time::Duration;

use crate::net::HttpClient;
use crate::resolver::formats::{FormatUrl, PlayerResponse, StreamFormat, select_library};
use crate::resolver::traits::{AdapterError, BackendAdapter};
use crate::resolver::types::{BackendKind, Candidate, MediaKind};

pub const DEFAULT_WATCH_BASE: &str = "https://www.youtube.com";

static PLAYER_RESPONSE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ytInitialPlayerResponse\s*=\s*").expect("static regex")
});

/// Pull the embedded player response out of a watch page
pub fn extract_player_response(html: &str) -> Result<PlayerResponse, AdapterError> {
    let start = PLAYER_RESPONSE_START
        .find(html)
        .ok_or_else(|| AdapterError::Malformed("no embedded player response".into()))?
        .end();

    // The object is followed by `;var ...`, so read exactly one JSON value
    serde_json::Deserializer::from_str(&html[start..])
        .into_iter::<PlayerResponse>()
        .next()
        .ok_or_else(|| AdapterError::Malformed("empty player response".into()))?
        .map_err(|e| AdapterError::Malformed(e.to_string()))
}

/// Single authoritative watch-page fetch
#[derive(Debug, Clone)]
pub struct LibraryExtractor {
    http: HttpClient,
    watch_base: String,
    timeout: Duration,
}

impl LibraryExtractor {
    pub fn new(http: HttpClient, timeout: Duration) -> Self {
        Self::with_base(http, DEFAULT_WATCH_BASE, timeout)
    }

    pub fn with_base(http: HttpClient, watch_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            watch_base: watch_base.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl BackendAdapter for LibraryExtractor {
    fn backend(&self) -> BackendKind {
        BackendKind::Library
    }

    async fn resolve(&self, content_id: &str, kind: MediaKind) -> Result<Candidate, AdapterError> {
        let url = format!("{}/watch?v={}&bpctr=9999999999&has_verified=1", self.watch_base, content_id);
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let html = self.http.get_text(&url, headers, self.timeout).await?;
        let player = extract_player_response(&html)?;
        player.check_playable().map_err(AdapterError::Rejected)?;

        let formats: Vec<StreamFormat> = player
            .stream_formats()
            .into_iter()
            .filter(|f| matches!(f.url, FormatUrl::Direct(_)))
            .collect();

        let chosen = select_library(&formats, kind)
            .and_then(|f| f.url.direct())
            .ok_or_else(|| {
                AdapterError::NoUsableStream(format!("watch page has no direct {kind} stream"))
            })?;

        let title = player.title().unwrap_or(content_id);
        Ok(Candidate::new(chosen, title, BackendKind::Library))
    }
}
