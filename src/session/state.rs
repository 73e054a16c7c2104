use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::resolver::{BackendKind, MediaKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Probing,
    Scanning,
    Tunneling,
    Ready,
    Fallback,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Ready | SessionStatus::Fallback)
    }

    /// Transitions only move forward; `Tunneling` may repeat for a second kind
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Idle, Probing)
                | (Idle, Scanning)
                | (Probing, Scanning)
                | (Probing, Tunneling)
                | (Probing, Fallback)
                | (Scanning, Tunneling)
                | (Scanning, Fallback)
                | (Tunneling, Tunneling)
                | (Tunneling, Ready)
                | (Tunneling, Fallback)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Probing => "probing",
            SessionStatus::Scanning => "scanning",
            SessionStatus::Tunneling => "tunneling",
            SessionStatus::Ready => "ready",
            SessionStatus::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes acquired for one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquiredMedia {
    pub filename: String,
    pub source_url: String,
    pub origin: BackendKind,
    pub content_type: Option<String>,
    pub size: u64,
    #[serde(skip)]
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionResults {
    pub audio: Option<AcquiredMedia>,
    pub video: Option<AcquiredMedia>,
}

impl SessionResults {
    pub fn set(&mut self, kind: MediaKind, media: AcquiredMedia) {
        match kind.for_relay() {
            MediaKind::Audio => self.audio = Some(media),
            _ => self.video = Some(media),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AcquiredMedia> {
        self.audio.iter().chain(self.video.iter())
    }
}

/// UI-facing view of one acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionSession {
    pub id: Uuid,
    pub content_id: Option<String>,
    pub kind: MediaKind,
    pub status: SessionStatus,
    pub progress: u8,
    pub results: SessionResults,
    pub fallback_url: Option<String>,
    pub error: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

impl AcquisitionSession {
    pub fn idle() -> Self {
        Self::new(None, MediaKind::Both)
    }

    pub fn new(content_id: Option<String>, kind: MediaKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content_id,
            kind,
            status: SessionStatus::Idle,
            progress: 0,
            results: SessionResults::default(),
            fallback_url: None,
            error: None,
            started_at: now,
            updated_at: now,
        }
    }
}
