//! Wire models of the resolve and health endpoints.
//!
//! `GET|POST /api/resolve` takes the keys of [`ResolveParams`] from the query
//! string or an `application/x-www-form-urlencoded` body:
//!
//! ```text
//! /api/resolve?id=dQw4w9WgXcQ&type=both              probe: JSON links
//! /api/resolve?id=dQw4w9WgXcQ&type=audio&pipe=true   tunnel: raw bytes
//! /api/resolve?id=dQw4w9WgXcQ&get_url=true           tunnel: URL only
//! /api/resolve?action=proxy&url=https%3A%2F%2F...    same-origin relay
//! ```
//!
//! A probe answers with a [`ProbeResponse`]:
//!
//! ```json
//! {
//!   "audio": { "url": "https://...", "filename": "Never Gonna Give You Up.mp3" },
//!   "video": null,
//!   "fallbackUrl": "https://cobalt.tools/?u=https://www.youtube.com/watch?v=dQw4w9WgXcQ",
//!   "status": "ready",
//!   "errors": ["video: P1:... | P2:... | P3:... | P4:..."]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::observability::MetricsSnapshot;

/// Raw request keys. Interpretation lives in `validation`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ResolveParams {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub pipe: Option<String>,
    pub get_url: Option<String>,
    pub direct_url: Option<String>,
    pub title: Option<String>,
    pub action: Option<String>,
    pub url: Option<String>,
}

impl ResolveParams {
    /// Build from decoded key/value pairs; later pairs win
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "id" => &mut params.id,
                "type" => &mut params.kind,
                "pipe" => &mut params.pipe,
                "get_url" => &mut params.get_url,
                "direct_url" => &mut params.direct_url,
                "title" => &mut params.title,
                "action" => &mut params.action,
                "url" => &mut params.url,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedLink {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Ready,
    FallbackRequired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    pub audio: Option<ResolvedLink>,
    pub video: Option<ResolvedLink>,
    pub fallback_url: String,
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub errors: Option<Vec<String>>,
}

/// `get_url` tunnel answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocatedResponse {
    pub url: String,
    pub title: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fallback_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
