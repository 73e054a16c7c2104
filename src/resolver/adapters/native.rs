use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::innertube::{DeviceProfile, PlayerClient};
use crate::resolver::formats::{FormatUrl, StreamFormat, select_native};
use crate::resolver::traits::{AdapterError, BackendAdapter};
use crate::resolver::types::{BackendKind, Candidate, MediaKind};

/// Queries the player catalog as each device profile in turn
#[derive(Debug, Clone)]
pub struct NativeExtractor {
    client: PlayerClient,
    profiles: Vec<DeviceProfile>,
    target_height: u32,
    timeout: Duration,
}

impl NativeExtractor {
    pub fn new(
        client: PlayerClient,
        profiles: Vec<DeviceProfile>,
        target_height: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            profiles,
            target_height,
            timeout,
        }
    }

    async fn try_profile(
        &self,
        content_id: &str,
        kind: MediaKind,
        profile: DeviceProfile,
    ) -> Result<Candidate, AdapterError> {
        let player = self.client.player(content_id, profile, self.timeout).await?;
        player.check_playable().map_err(AdapterError::Rejected)?;

        // No decipher helper on this path
        let formats: Vec<StreamFormat> = player
            .stream_formats()
            .into_iter()
            .filter(|f| matches!(f.url, FormatUrl::Direct(_)))
            .collect();

        let chosen = select_native(&formats, kind, self.target_height)
            .and_then(|f| f.url.direct())
            .ok_or_else(|| {
                AdapterError::NoUsableStream(format!("{} formats, none matched {kind}", formats.len()))
            })?;

        let title = player.title().unwrap_or(content_id);
        Ok(Candidate::new(chosen, title, BackendKind::Native))
    }
}

#[async_trait]
impl BackendAdapter for NativeExtractor {
    fn backend(&self) -> BackendKind {
        BackendKind::Native
    }

    async fn resolve(&self, content_id: &str, kind: MediaKind) -> Result<Candidate, AdapterError> {
        let mut failures = Vec::with_capacity(self.profiles.len());

        for &profile in &self.profiles {
            match self.try_profile(content_id, kind, profile).await {
                Ok(candidate) => {
                    debug!(content_id, %profile, "Native profile yielded a stream");
                    return Ok(candidate);
                }
                Err(e) => {
                    debug!(content_id, %profile, error = %e, "Native profile failed");
                    failures.push(format!("{profile}: {e}"));
                }
            }
        }

        if failures.is_empty() {
            return Err(AdapterError::NoUsableStream("no device profiles configured".into()));
        }
        Err(AdapterError::Rejected(failures.join(", ")))
    }
}
