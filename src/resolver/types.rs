use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which media a caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Both,
}

impl MediaKind {
    /// Kinds resolved independently in probe mode
    pub fn expand(self) -> &'static [MediaKind] {
        match self {
            MediaKind::Audio => &[MediaKind::Audio],
            MediaKind::Video => &[MediaKind::Video],
            MediaKind::Both => &[MediaKind::Audio, MediaKind::Video],
        }
    }

    /// A single relayed stream for `Both` is the muxed video
    pub fn for_relay(self) -> MediaKind {
        match self {
            MediaKind::Audio => MediaKind::Audio,
            MediaKind::Video | MediaKind::Both => MediaKind::Video,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Both => "both",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown media type '{0}', expected audio, video or both")]
pub struct ParseKindError(pub String);

impl FromStr for MediaKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            "both" | "" => Ok(MediaKind::Both),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

/// Probe returns URLs only; tunnel moves the bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Probe,
    Tunnel,
}

/// One caller invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub content_id: Option<String>,
    pub kind: MediaKind,
    pub mode: Mode,
    pub direct_url: Option<String>,
}

impl MediaRequest {
    pub fn probe(content_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            content_id: Some(content_id.into()),
            kind,
            mode: Mode::Probe,
            direct_url: None,
        }
    }

    pub fn tunnel(content_id: Option<String>, kind: MediaKind, direct_url: Option<String>) -> Self {
        Self {
            content_id,
            kind,
            mode: Mode::Tunnel,
            direct_url,
        }
    }
}

/// Backend that produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Native,
    Library,
    MirrorFleetA,
    MirrorFleetB,
    ClientMirrorFleetA,
    ClientMirrorFleetB,
    ClientCanonical,
    /// Caller-supplied upstream URL (tunnel phase 0)
    Direct,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Library => "library",
            BackendKind::MirrorFleetA => "mirror_fleet_a",
            BackendKind::MirrorFleetB => "mirror_fleet_b",
            BackendKind::ClientMirrorFleetA => "client_mirror_fleet_a",
            BackendKind::ClientMirrorFleetB => "client_mirror_fleet_b",
            BackendKind::ClientCanonical => "client_canonical",
            BackendKind::Direct => "direct",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved upstream stream URL. Moved to its consumer, never cached.
#[derive(Debug, PartialEq, Eq)]
pub struct Candidate {
    pub source_url: String,
    pub title: String,
    pub origin: BackendKind,
}

impl Candidate {
    pub fn new(source_url: impl Into<String>, title: impl Into<String>, origin: BackendKind) -> Self {
        Self {
            source_url: source_url.into(),
            title: title.into(),
            origin,
        }
    }

    pub fn is_usable(&self) -> bool {
        let url = self.source_url.trim();
        url.starts_with("http://") || url.starts_with("https://")
    }
}

/// API contract implemented by a mirror endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorClass {
    /// `GET /streams/{id}`
    Piped,
    /// `GET /api/v1/videos/{id}`
    Invidious,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MirrorEndpoint {
    pub base_url: String,
    pub class: MirrorClass,
}

impl MirrorEndpoint {
    pub fn new(base_url: impl Into<String>, class: MirrorClass) -> Self {
        Self {
            base_url: base_url.into(),
            class,
        }
    }
}

impl fmt::Display for MirrorEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// Result of one phase attempt
#[derive(Debug)]
pub enum PhaseOutcome {
    Success(Candidate),
    Failure(Vec<String>),
}
