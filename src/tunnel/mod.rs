//! Stream Tunnel
//!
//! Fetches a resolved upstream URL with spoofed browser headers and
//! republishes the body to the caller, either streamed straight through
//! ([`Relay::into_response`]) or collected chunk by chunk with progress
//! ([`Relay::collect`]).

pub mod headers;

use axum::body::Body;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_LENGTH;
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::net::{FetchError, HttpClient};
use crate::observability::Metrics;
use crate::resolver::{BackendKind, Candidate, ChainError, MediaKind, PhaseChain};

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("stream relay failed: {0}")]
    StreamRelayFailure(String),

    #[error(transparent)]
    Resolution(#[from] ChainError),

    #[error("no content id or direct URL supplied")]
    MissingSource,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// What to relay
#[derive(Debug, Clone, Default)]
pub struct RelayRequest {
    pub content_id: Option<String>,
    pub kind: Option<MediaKind>,
    /// Tried before any resolution
    pub direct_url: Option<String>,
    /// Filename hint when no candidate title exists
    pub title: Option<String>,
}

impl RelayRequest {
    pub fn for_id(content_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            content_id: Some(content_id.into()),
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Relayed kind; `both` is served as muxed video
    pub fn relay_kind(&self) -> MediaKind {
        self.kind.unwrap_or(MediaKind::Both).for_relay()
    }
}

/// Bytes moved so far. `total_bytes` is known only when upstream sent a length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferProgress {
    pub bytes_read: u64,
    pub total_bytes: Option<u64>,
}

impl TransferProgress {
    pub fn percent(&self) -> Option<u8> {
        let total = self.total_bytes.filter(|&t| t > 0)?;
        Some(((self.bytes_read.min(total) * 100) / total) as u8)
    }
}

/// URL-only tunnel result (`get_url` mode)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedStream {
    pub url: String,
    pub title: String,
    pub filename: String,
}

/// An open upstream body plus the headers it will be served with
#[derive(Debug)]
pub struct Relay {
    upstream: reqwest::Response,
    headers: HeaderMap,
    filename: Option<String>,
    origin: BackendKind,
    metrics: Arc<Metrics>,
}

impl Relay {
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn origin(&self) -> BackendKind {
        self.origin
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Stream the upstream body through without buffering it
    pub fn into_response(self) -> Response {
        let metrics = self.metrics;
        let stream = self
            .upstream
            .bytes_stream()
            .inspect_ok(move |chunk| metrics.add_bytes_relayed(chunk.len() as u64));

        let mut response = Response::new(Body::from_stream(stream));
        *response.headers_mut() = self.headers;
        response
    }

    /// Read the whole body, publishing progress after every chunk
    pub async fn collect(
        self,
        progress: &watch::Sender<TransferProgress>,
    ) -> Result<Bytes, TunnelError> {
        let total_bytes = self.content_length();
        let capacity = total_bytes.unwrap_or(0).min(64 * 1024 * 1024) as usize;
        let mut buffer = BytesMut::with_capacity(capacity);
        let mut stream = self.upstream.bytes_stream();

        progress.send_replace(TransferProgress {
            bytes_read: 0,
            total_bytes,
        });

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                self.metrics.relay_failed();
                TunnelError::StreamRelayFailure(e.to_string())
            })?;
            self.metrics.add_bytes_relayed(chunk.len() as u64);
            buffer.extend_from_slice(&chunk);
            progress.send_replace(TransferProgress {
                bytes_read: buffer.len() as u64,
                total_bytes,
            });
        }

        Ok(buffer.freeze())
    }
}

/// Resolves (when needed) and opens upstream media
#[derive(Debug, Clone)]
pub struct StreamTunnel {
    http: HttpClient,
    chain: Arc<PhaseChain>,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl StreamTunnel {
    pub fn new(
        http: HttpClient,
        chain: Arc<PhaseChain>,
        timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            http,
            chain,
            timeout,
            metrics,
        }
    }

    pub fn chain(&self) -> &Arc<PhaseChain> {
        &self.chain
    }

    /// Relay a stream: the direct URL first, then Phase Chain resolution
    pub async fn relay(&self, request: &RelayRequest) -> Result<Relay, TunnelError> {
        self.metrics.relay_started();
        let kind = request.relay_kind();

        let content_id = match (&request.direct_url, &request.content_id) {
            (Some(direct), id) => match self.fetch(direct).await {
                Ok(upstream) => {
                    info!(content_id = ?id, "Relaying caller-supplied URL");
                    let filename = self.filename(request, None);
                    return Ok(self.wrap(upstream, kind, filename, BackendKind::Direct));
                }
                Err(e) => {
                    warn!(content_id = ?id, error = %e, "Direct URL failed, falling back to resolution");
                    match id {
                        Some(id) => id,
                        None => {
                            self.metrics.relay_failed();
                            return Err(TunnelError::StreamRelayFailure(e.to_string()));
                        }
                    }
                }
            },
            (None, Some(id)) => id,
            (None, None) => return Err(TunnelError::MissingSource),
        };

        let candidate = self.chain.resolve(content_id, kind).await?;
        self.relay_candidate(candidate, request).await
    }

    /// Relay an already resolved candidate
    pub async fn relay_candidate(
        &self,
        candidate: Candidate,
        request: &RelayRequest,
    ) -> Result<Relay, TunnelError> {
        let kind = request.relay_kind();
        let upstream = self.fetch(&candidate.source_url).await.map_err(|e| {
            warn!(origin = %candidate.origin, error = %e, "Upstream fetch failed");
            self.metrics.relay_failed();
            TunnelError::StreamRelayFailure(e.to_string())
        })?;

        info!(origin = %candidate.origin, "Relaying resolved stream");
        let filename = self.filename(request, Some(&candidate.title));
        Ok(self.wrap(upstream, kind, filename, candidate.origin))
    }

    /// Resolve to a URL without moving any bytes. Same ordering as [`relay`](Self::relay).
    pub async fn locate(&self, request: &RelayRequest) -> Result<LocatedStream, TunnelError> {
        let kind = request.relay_kind();

        let content_id = match (&request.direct_url, &request.content_id) {
            (Some(direct), id) => match self.fetch(direct).await {
                Ok(_) => {
                    return Ok(LocatedStream {
                        url: direct.clone(),
                        title: request
                            .title
                            .clone()
                            .or_else(|| id.clone())
                            .unwrap_or_default(),
                        filename: self.filename(request, None),
                    });
                }
                Err(e) => match id {
                    Some(id) => id,
                    None => return Err(TunnelError::StreamRelayFailure(e.to_string())),
                },
            },
            (None, Some(id)) => id,
            (None, None) => return Err(TunnelError::MissingSource),
        };

        let candidate = self.chain.resolve(content_id, kind).await?;
        let filename = self.filename(request, Some(&candidate.title));
        Ok(LocatedStream {
            url: candidate.source_url,
            title: candidate.title,
            filename,
        })
    }

    /// Generic relay of an arbitrary http(s) URL, content type and length only
    pub async fn proxy(&self, target: &str) -> Result<Relay, TunnelError> {
        let parsed = url::Url::parse(target).map_err(|e| TunnelError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TunnelError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let upstream = self
            .http
            .open(parsed.as_str(), HeaderMap::new(), self.timeout)
            .await
            .map_err(|e| TunnelError::StreamRelayFailure(e.to_string()))?;

        let headers = headers::proxy_headers(upstream.headers());
        Ok(Relay {
            upstream,
            headers,
            filename: None,
            origin: BackendKind::Direct,
            metrics: Arc::clone(&self.metrics),
        })
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let spoofed = headers::spoof_headers(self.http.user_agent());
        self.http.open(url, spoofed, self.timeout).await
    }

    fn filename(&self, request: &RelayRequest, candidate_title: Option<&str>) -> String {
        let title = candidate_title
            .filter(|t| Some(*t) != request.content_id.as_deref())
            .or(request.title.as_deref())
            .or(candidate_title);
        let stem = headers::sanitize_filename(title, request.content_id.as_deref());
        headers::filename_for(&stem, request.relay_kind())
    }

    fn wrap(
        &self,
        upstream: reqwest::Response,
        kind: MediaKind,
        filename: String,
        origin: BackendKind,
    ) -> Relay {
        let headers = headers::relay_headers(upstream.headers(), kind, &filename);
        Relay {
            upstream,
            headers,
            filename: Some(filename),
            origin,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percent() {
        let p = TransferProgress {
            bytes_read: 50,
            total_bytes: Some(200),
        };
        assert_eq!(p.percent(), Some(25));

        let unknown = TransferProgress {
            bytes_read: 50,
            total_bytes: None,
        };
        assert_eq!(unknown.percent(), None);
    }

    #[test]
    fn both_is_relayed_as_video() {
        let request = RelayRequest::for_id("abc", MediaKind::Both);
        assert_eq!(request.relay_kind(), MediaKind::Video);
        assert_eq!(RelayRequest::default().relay_kind(), MediaKind::Video);
    }
}
