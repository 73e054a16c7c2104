//! Ordered, short-circuiting sequence of backend adapters

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::adapters::{
    DeviceProfile, LibraryExtractor, MirrorFleet, MirrorProbe, NativeExtractor, PlayerClient,
};
use super::fleet::FleetRacer;
use super::traits::{AdapterError, BackendAdapter};
use super::types::{BackendKind, Candidate, MediaKind, PhaseOutcome};
use crate::config::{Config, MirrorTable};
use crate::net::{HttpClient, NetworkContext};
use crate::observability::Metrics;

/// Failure record of one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    /// 1-based position in the chain
    pub phase: usize,
    pub backend: BackendKind,
    pub errors: Vec<String>,
}

impl PhaseReport {
    /// `P<n>:<message>`
    pub fn tag(&self) -> String {
        format!("P{}:{}", self.phase, self.errors.join("; "))
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("{}", format_tags(.phases))]
    ExtractionExhausted { phases: Vec<PhaseReport> },
}

impl ChainError {
    pub fn phases(&self) -> &[PhaseReport] {
        match self {
            ChainError::ExtractionExhausted { phases } => phases,
        }
    }
}

fn format_tags(phases: &[PhaseReport]) -> String {
    if phases.is_empty() {
        return "no extraction phases configured".to_string();
    }
    phases
        .iter()
        .map(PhaseReport::tag)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Result of running every phase until one succeeds
#[derive(Debug)]
pub struct ChainRun {
    pub candidate: Option<Candidate>,
    /// Failed phases in execution order
    pub reports: Vec<PhaseReport>,
}

impl ChainRun {
    pub fn into_result(self) -> Result<Candidate, ChainError> {
        self.candidate.ok_or(ChainError::ExtractionExhausted {
            phases: self.reports,
        })
    }
}

/// Phases run strictly one after another. Nothing is memoized between calls.
pub struct PhaseChain {
    phases: Vec<Arc<dyn BackendAdapter>>,
    metrics: Arc<Metrics>,
}

impl fmt::Debug for PhaseChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phases: Vec<_> = self.phases.iter().map(|p| p.backend()).collect();
        f.debug_struct("PhaseChain").field("phases", &phases).finish()
    }
}

impl PhaseChain {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            phases: Vec::new(),
            metrics,
        }
    }

    /// Append a phase
    pub fn with_phase(mut self, adapter: Arc<dyn BackendAdapter>) -> Self {
        self.phases.push(adapter);
        self
    }

    /// Native, Library, Piped fleet, Invidious fleet
    pub fn from_config(
        config: &Config,
        table: &MirrorTable,
        http: HttpClient,
        metrics: Arc<Metrics>,
    ) -> Self {
        let profiles: Vec<DeviceProfile> = config
            .native
            .profiles
            .iter()
            .filter_map(|name| DeviceProfile::from_name(name))
            .collect();

        let native = NativeExtractor::new(
            PlayerClient::new(http.clone()),
            profiles,
            config.fleet.target_height,
            config.timeouts.native(),
        );
        let library = LibraryExtractor::new(http.clone(), config.timeouts.library());

        let racer = FleetRacer::new(config.fleet.race_width, config.timeouts.mirror());
        let probe = MirrorProbe::new(
            NetworkContext::direct(http),
            config.timeouts.mirror(),
            config.fleet.preferred_audio_codec.clone(),
        );
        let fleet_a = MirrorFleet::new(
            BackendKind::MirrorFleetA,
            Arc::clone(&table.piped),
            racer.clone(),
            probe.clone(),
        );
        let fleet_b = MirrorFleet::new(
            BackendKind::MirrorFleetB,
            Arc::clone(&table.invidious),
            racer,
            probe,
        );

        Self::new(metrics)
            .with_phase(Arc::new(native))
            .with_phase(Arc::new(library))
            .with_phase(Arc::new(fleet_a))
            .with_phase(Arc::new(fleet_b))
    }

    pub fn backends(&self) -> Vec<BackendKind> {
        self.phases.iter().map(|p| p.backend()).collect()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub async fn resolve(&self, content_id: &str, kind: MediaKind) -> Result<Candidate, ChainError> {
        self.run(content_id, kind).await.into_result()
    }

    /// Run phases in order, stopping at the first usable candidate
    pub async fn run(&self, content_id: &str, kind: MediaKind) -> ChainRun {
        let mut reports = Vec::new();

        for (index, adapter) in self.phases.iter().enumerate() {
            let phase = index + 1;
            let backend = adapter.backend();

            match attempt(adapter.as_ref(), content_id, kind).await {
                PhaseOutcome::Success(candidate) => {
                    info!(content_id, phase, %backend, "Phase resolved candidate");
                    self.metrics.resolution_succeeded();
                    return ChainRun {
                        candidate: Some(candidate),
                        reports,
                    };
                }
                PhaseOutcome::Failure(errors) => {
                    warn!(content_id, phase, %backend, error = %errors.join("; "), "Phase failed");
                    self.metrics.phase_failed();
                    reports.push(PhaseReport {
                        phase,
                        backend,
                        errors,
                    });
                }
            }
        }

        warn!(content_id, %kind, phases = reports.len(), "Extraction exhausted");
        self.metrics.extraction_exhausted();
        ChainRun {
            candidate: None,
            reports,
        }
    }
}

async fn attempt(adapter: &dyn BackendAdapter, content_id: &str, kind: MediaKind) -> PhaseOutcome {
    match adapter.resolve(content_id, kind).await {
        Ok(candidate) if candidate.is_usable() => PhaseOutcome::Success(candidate),
        Ok(candidate) => PhaseOutcome::Failure(vec![
            AdapterError::NoUsableStream(format!("unusable URL '{}'", candidate.source_url))
                .to_string(),
        ]),
        Err(e) => PhaseOutcome::Failure(e.messages()),
    }
}
