use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::types::{BackendKind, Candidate, MediaKind};
use crate::net::FetchError;

/// Failure of a single adapter attempt. Always absorbed by the caller and
/// turned into the next attempt.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("no usable stream: {0}")]
    NoUsableStream(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("all {} endpoints failed: {}", .0.len(), .0.join("; "))]
    FleetExhausted(Vec<String>),
}

impl AdapterError {
    /// One message per failed attempt (one per endpoint for fleets)
    pub fn messages(&self) -> Vec<String> {
        match self {
            AdapterError::FleetExhausted(failures) => failures.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl From<FetchError> for AdapterError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Timeout(after) => AdapterError::Timeout(after),
            FetchError::Request(msg) | FetchError::InvalidUrl(msg) => {
                AdapterError::Unreachable(msg)
            }
            status @ FetchError::Status { .. } => AdapterError::Rejected(status.to_string()),
            FetchError::Decode(msg) => AdapterError::Malformed(msg),
        }
    }
}

/// A strategy that turns a content id into a candidate stream URL
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    async fn resolve(&self, content_id: &str, kind: MediaKind) -> Result<Candidate, AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fleet_exhaustion_keeps_one_message_per_endpoint() {
        let err = AdapterError::FleetExhausted(vec![
            "https://a: HTTP 500".into(),
            "https://b: timed out".into(),
        ]);
        assert_eq!(err.messages().len(), 2);
        assert_eq!(
            err.to_string(),
            "all 2 endpoints failed: https://a: HTTP 500; https://b: timed out"
        );
    }

    #[test]
    fn fetch_errors_map_to_taxonomy() {
        let timeout: AdapterError = FetchError::Timeout(Duration::from_secs(9)).into();
        assert!(matches!(timeout, AdapterError::Timeout(_)));

        let status: AdapterError = FetchError::Status {
            status: 403,
            reason: "Forbidden".into(),
        }
        .into();
        assert!(matches!(status, AdapterError::Rejected(ref m) if m.contains("403")));
    }
}
