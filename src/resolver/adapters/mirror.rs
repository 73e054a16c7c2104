use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::invidious::InvidiousVideo;
use super::piped::PipedStreams;
use crate::net::NetworkContext;
use crate::resolver::fleet::{FleetRacer, RaceOutcome};
use crate::resolver::formats::{MirrorListing, select_mirror_stream};
use crate::resolver::traits::{AdapterError, BackendAdapter};
use crate::resolver::types::{BackendKind, Candidate, MediaKind, MirrorClass, MirrorEndpoint};

/// One request against one mirror endpoint, normalized and run through the
/// mirror selection policy. Shared by the server fleets and the client probe.
#[derive(Debug, Clone)]
pub struct MirrorProbe {
    ctx: NetworkContext,
    timeout: Duration,
    preferred_codec: Arc<str>,
}

impl MirrorProbe {
    pub fn new(ctx: NetworkContext, timeout: Duration, preferred_codec: impl Into<Arc<str>>) -> Self {
        Self {
            ctx,
            timeout,
            preferred_codec: preferred_codec.into(),
        }
    }

    pub async fn fetch(
        &self,
        endpoint: &MirrorEndpoint,
        content_id: &str,
        kind: MediaKind,
        origin: BackendKind,
    ) -> Result<Candidate, AdapterError> {
        let listing = self.listing(endpoint, content_id).await?;
        if listing.streams.is_empty() {
            return Err(AdapterError::NoUsableStream("empty stream list".into()));
        }

        let stream = select_mirror_stream(&listing.streams, kind, &self.preferred_codec)
            .ok_or_else(|| {
                AdapterError::NoUsableStream(format!(
                    "{} streams, none matched {kind}",
                    listing.streams.len()
                ))
            })?;

        debug!(content_id, %endpoint, quality = ?stream.quality, "Mirror returned stream");
        let title = listing.title.as_deref().unwrap_or(content_id);
        Ok(Candidate::new(stream.url.clone(), title, origin))
    }

    async fn listing(
        &self,
        endpoint: &MirrorEndpoint,
        content_id: &str,
    ) -> Result<MirrorListing, AdapterError> {
        let http = self.ctx.http();
        let listing = match endpoint.class {
            MirrorClass::Piped => {
                let url = self
                    .ctx
                    .mirror_url(&format!("{}/streams/{}", endpoint.base_url, content_id))?;
                http.get_json::<PipedStreams>(&url, self.timeout).await?.into()
            }
            MirrorClass::Invidious => {
                let url = self
                    .ctx
                    .mirror_url(&format!("{}/api/v1/videos/{}", endpoint.base_url, content_id))?;
                http.get_json::<InvidiousVideo>(&url, self.timeout).await?.into()
            }
        };
        Ok(listing)
    }
}

/// A pool of same-class mirrors raced for the first usable stream
#[derive(Debug, Clone)]
pub struct MirrorFleet {
    backend: BackendKind,
    endpoints: Arc<[MirrorEndpoint]>,
    racer: FleetRacer,
    probe: MirrorProbe,
}

impl MirrorFleet {
    pub fn new(
        backend: BackendKind,
        endpoints: Arc<[MirrorEndpoint]>,
        racer: FleetRacer,
        probe: MirrorProbe,
    ) -> Self {
        Self {
            backend,
            endpoints,
            racer,
            probe,
        }
    }

    pub fn endpoints(&self) -> &[MirrorEndpoint] {
        &self.endpoints
    }
}

#[async_trait]
impl BackendAdapter for MirrorFleet {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    async fn resolve(&self, content_id: &str, kind: MediaKind) -> Result<Candidate, AdapterError> {
        if self.endpoints.is_empty() {
            return Err(AdapterError::Unreachable("no mirror endpoints configured".into()));
        }

        let probe = self.probe.clone();
        let id: Arc<str> = Arc::from(content_id);
        let origin = self.backend;

        let outcome = self
            .racer
            .race(&self.endpoints[..], move |endpoint: MirrorEndpoint, _token| {
                let probe = probe.clone();
                let id = Arc::clone(&id);
                async move { probe.fetch(&endpoint, &id, kind, origin).await }
            })
            .await;

        match outcome {
            RaceOutcome::Won { target, value } => {
                debug!(content_id, endpoint = %target, backend = %origin, "Fleet race won");
                Ok(value)
            }
            RaceOutcome::Exhausted { failures } => Err(AdapterError::FleetExhausted(failures)),
        }
    }
}
