use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::controller::{SessionController, SessionError, SessionTicket};
use super::state::{AcquiredMedia, AcquisitionSession, SessionResults};
use crate::config::FallbackConfig;
use crate::probe::ClientProbe;
use crate::resolver::{Candidate, MediaKind};
use crate::tunnel::{RelayRequest, StreamTunnel, TransferProgress};

/// Drives one whole acquisition: client probe, server-side fallback,
/// buffered tunnel, then `Ready` or `Fallback`.
#[derive(Debug, Clone)]
pub struct Acquirer {
    controller: Arc<SessionController>,
    probe: ClientProbe,
    tunnel: StreamTunnel,
    fallback: FallbackConfig,
}

impl Acquirer {
    pub fn new(
        controller: Arc<SessionController>,
        probe: ClientProbe,
        tunnel: StreamTunnel,
        fallback: FallbackConfig,
    ) -> Self {
        Self {
            controller,
            probe,
            tunnel,
            fallback,
        }
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// Returns the final snapshot, or [`SessionError::Superseded`] when a
    /// newer request took over mid-flight.
    pub async fn acquire(
        &self,
        content_id: &str,
        kind: MediaKind,
    ) -> Result<AcquisitionSession, SessionError> {
        let ticket = self.controller.begin(Some(content_id.to_string()), kind).await;
        let kinds = kind.expand();
        let mut errors = Vec::new();

        // Probing: both kinds in parallel
        let probed = join_all(kinds.iter().map(|&k| self.probe.probe_detailed(content_id, k))).await;
        let mut resolved: Vec<(MediaKind, Option<Candidate>)> = kinds
            .iter()
            .copied()
            .zip(probed)
            .map(|(k, report)| {
                if report.candidate.is_none() {
                    errors.push(format!("{k} probe: {} failures", report.failures().count()));
                }
                (k, report.candidate)
            })
            .collect();
        ensure_current(&ticket)?;

        // Scanning: server-side chain for whatever the probe missed
        if resolved.iter().any(|(_, c)| c.is_none()) {
            self.controller.mark_scanning(&ticket).await?;
            for (k, slot) in resolved.iter_mut().filter(|(_, c)| c.is_none()) {
                match self.tunnel.chain().resolve(content_id, *k).await {
                    Ok(candidate) => *slot = Some(candidate),
                    Err(e) => errors.push(format!("{k}: {e}")),
                }
                ensure_current(&ticket)?;
            }
        }

        let found: Vec<(MediaKind, Candidate)> = resolved
            .into_iter()
            .filter_map(|(k, c)| c.map(|c| (k, c)))
            .collect();

        if found.is_empty() {
            return self.give_up(&ticket, content_id, errors).await;
        }

        // Tunneling: one kind after another, progress spread evenly
        self.controller.mark_tunneling(&ticket).await?;
        let mut results = SessionResults::default();
        let share = 100 / found.len() as u32;

        for (index, (k, candidate)) in found.into_iter().enumerate() {
            let base = index as u32 * share;
            match self.transfer(&ticket, content_id, k, candidate, base, share).await {
                Ok(media) => {
                    info!(content_id, kind = %k, size = media.size, "Acquired media");
                    results.set(k, media);
                }
                Err(TransferFailure::Superseded) => return Err(SessionError::Superseded),
                Err(TransferFailure::Relay(msg)) => {
                    warn!(content_id, kind = %k, error = %msg, "Transfer failed");
                    errors.push(format!("{k}: {msg}"));
                }
            }
        }

        if results.is_empty() {
            return self.give_up(&ticket, content_id, errors).await;
        }

        self.controller.complete(&ticket, results).await?;
        Ok(self.controller.snapshot().await)
    }

    async fn transfer(
        &self,
        ticket: &SessionTicket,
        content_id: &str,
        kind: MediaKind,
        candidate: Candidate,
        base: u32,
        share: u32,
    ) -> Result<AcquiredMedia, TransferFailure> {
        let request = RelayRequest::for_id(content_id, kind);
        let source_url = candidate.source_url.clone();
        let origin = candidate.origin;

        let relay = self
            .tunnel
            .relay_candidate(candidate, &request)
            .await
            .map_err(|e| TransferFailure::Relay(e.to_string()))?;

        let filename = relay.filename().unwrap_or("download").to_string();
        let content_type = relay
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let (tx, mut rx) = watch::channel(TransferProgress::default());
        let transfer = async move { relay.collect(&tx).await };
        let forward = async {
            while rx.changed().await.is_ok() {
                let progress = *rx.borrow_and_update();
                if let Some(pct) = progress.percent() {
                    let overall = (base + u32::from(pct) * share / 100).min(99) as u8;
                    if self.controller.report_progress(ticket, overall).await.is_err() {
                        break;
                    }
                }
            }
        };

        let (data, ()) = tokio::select! {
            _ = ticket.token().cancelled() => return Err(TransferFailure::Superseded),
            joined = async { tokio::join!(transfer, forward) } => joined,
        };
        let data = data.map_err(|e| TransferFailure::Relay(e.to_string()))?;

        Ok(AcquiredMedia {
            filename,
            source_url,
            origin,
            content_type,
            size: data.len() as u64,
            data,
        })
    }

    async fn give_up(
        &self,
        ticket: &SessionTicket,
        content_id: &str,
        errors: Vec<String>,
    ) -> Result<AcquisitionSession, SessionError> {
        let summary = errors.join(" | ");
        warn!(content_id, error = %summary, "Acquisition fell back");
        self.controller
            .fail(ticket, Some(self.fallback.link_for(content_id)), summary)
            .await?;
        Ok(self.controller.snapshot().await)
    }
}

enum TransferFailure {
    Superseded,
    Relay(String),
}

fn ensure_current(ticket: &SessionTicket) -> Result<(), SessionError> {
    if ticket.is_cancelled() {
        return Err(SessionError::Superseded);
    }
    Ok(())
}
