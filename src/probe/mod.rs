//! Client-Side Probe
//!
//! The same resolution core run from the caller's network context, against
//! a larger target set: canonical-host device profiles lead, followed by the
//! shuffled union of both mirror classes. Targets are raced in fixed-size
//! waves; a later wave only starts once the previous one is exhausted.

mod decipher;

pub use decipher::DecipherHelper;

use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, MirrorTable};
use crate::net::{HttpClient, NetworkContext};
use crate::observability::Metrics;
use crate::resolver::adapters::{DeviceProfile, MirrorProbe, PlayerClient};
use crate::resolver::formats::{FormatUrl, select_native};
use crate::resolver::{
    AdapterError, BackendKind, Candidate, FleetRacer, MediaKind, MirrorClass, MirrorEndpoint,
    RaceOutcome,
};

/// One thing the probe can ask for a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    /// Canonical host impersonating a device
    Canonical(DeviceProfile),
    Mirror(MirrorEndpoint),
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeTarget::Canonical(profile) => write!(f, "canonical:{profile}"),
            ProbeTarget::Mirror(endpoint) => write!(f, "{endpoint}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveReport {
    /// 1-based
    pub wave: usize,
    pub failures: Vec<String>,
}

#[derive(Debug)]
pub struct ProbeReport {
    pub candidate: Option<Candidate>,
    /// Exhausted waves, in order
    pub waves: Vec<WaveReport>,
}

impl ProbeReport {
    pub fn failures(&self) -> impl Iterator<Item = &String> {
        self.waves.iter().flat_map(|w| w.failures.iter())
    }
}

/// Everything a single target attempt needs, shared by the wave's tasks
#[derive(Debug)]
struct Attempt {
    player: PlayerClient,
    mirrors: MirrorProbe,
    decipher: Option<DecipherHelper>,
    discovery_timeout: Duration,
    target_height: u32,
}

impl Attempt {
    async fn run(
        &self,
        target: &ProbeTarget,
        content_id: &str,
        kind: MediaKind,
    ) -> Result<Candidate, AdapterError> {
        match target {
            ProbeTarget::Canonical(profile) => self.canonical(*profile, content_id, kind).await,
            ProbeTarget::Mirror(endpoint) => {
                let origin = match endpoint.class {
                    MirrorClass::Piped => BackendKind::ClientMirrorFleetA,
                    MirrorClass::Invidious => BackendKind::ClientMirrorFleetB,
                };
                self.mirrors.fetch(endpoint, content_id, kind, origin).await
            }
        }
    }

    async fn canonical(
        &self,
        profile: DeviceProfile,
        content_id: &str,
        kind: MediaKind,
    ) -> Result<Candidate, AdapterError> {
        let player = self
            .player
            .player(content_id, profile, self.discovery_timeout)
            .await?;
        player.check_playable().map_err(AdapterError::Rejected)?;

        let mut formats = player.stream_formats();
        if self.decipher.is_none() {
            formats.retain(|f| matches!(f.url, FormatUrl::Direct(_)));
        }

        let chosen = select_native(&formats, kind, self.target_height).ok_or_else(|| {
            AdapterError::NoUsableStream(format!("{} formats, none matched {kind}", formats.len()))
        })?;

        let url = match (&chosen.url, &self.decipher) {
            (FormatUrl::Direct(url), _) => url.clone(),
            (FormatUrl::Ciphered(cipher), Some(helper)) => {
                helper.decipher(content_id, cipher).await?
            }
            (FormatUrl::Ciphered(_), None) => {
                return Err(AdapterError::NoUsableStream(
                    "ciphered stream without decipher helper".into(),
                ));
            }
        };

        let title = player.title().unwrap_or(content_id);
        Ok(Candidate::new(url, title, BackendKind::ClientCanonical))
    }
}

#[derive(Debug, Clone)]
pub struct ClientProbe {
    player: PlayerClient,
    mirrors: MirrorProbe,
    decipher: Option<DecipherHelper>,
    profiles: Vec<DeviceProfile>,
    piped: Arc<[MirrorEndpoint]>,
    invidious: Arc<[MirrorEndpoint]>,
    wave_size: usize,
    discovery_timeout: Duration,
    mirror_timeout: Duration,
    target_height: u32,
    metrics: Arc<Metrics>,
}

impl ClientProbe {
    pub fn new(player: PlayerClient, mirrors: MirrorProbe, metrics: Arc<Metrics>) -> Self {
        Self {
            player,
            mirrors,
            decipher: None,
            profiles: vec![DeviceProfile::AndroidVr, DeviceProfile::Ios],
            piped: Arc::from(Vec::new()),
            invidious: Arc::from(Vec::new()),
            wave_size: 4,
            discovery_timeout: Duration::from_secs(3),
            mirror_timeout: Duration::from_secs(9),
            target_height: 720,
            metrics,
        }
    }

    /// Build from configuration; mirror requests go through the relay when one is set
    pub fn from_config(
        config: &Config,
        table: &MirrorTable,
        http: HttpClient,
        metrics: Arc<Metrics>,
    ) -> Self {
        let ctx = match &config.probe.relay_endpoint {
            Some(relay) => NetworkContext::relayed(http.clone(), relay.clone()),
            None => NetworkContext::direct(http.clone()),
        };
        let mirrors = MirrorProbe::new(
            ctx,
            config.timeouts.mirror(),
            config.fleet.preferred_audio_codec.clone(),
        );
        let profiles = config
            .probe
            .profiles
            .iter()
            .filter_map(|name| DeviceProfile::from_name(name))
            .collect();

        let mut probe = Self::new(PlayerClient::new(http.clone()), mirrors, metrics)
            .with_profiles(profiles)
            .with_mirrors(Arc::clone(&table.client_piped), Arc::clone(&table.client_invidious))
            .with_wave_size(config.probe.wave_size)
            .with_timeouts(config.timeouts.discovery(), config.timeouts.mirror())
            .with_target_height(config.fleet.target_height);

        if let Some(endpoint) = &config.probe.decipher_helper {
            probe = probe.with_decipher(DecipherHelper::new(
                http,
                endpoint.clone(),
                config.timeouts.discovery(),
            ));
        }
        probe
    }

    pub fn with_profiles(mut self, profiles: Vec<DeviceProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_mirrors(
        mut self,
        piped: Arc<[MirrorEndpoint]>,
        invidious: Arc<[MirrorEndpoint]>,
    ) -> Self {
        self.piped = piped;
        self.invidious = invidious;
        self
    }

    pub fn with_wave_size(mut self, wave_size: usize) -> Self {
        self.wave_size = wave_size.max(1);
        self
    }

    pub fn with_timeouts(mut self, discovery: Duration, mirror: Duration) -> Self {
        self.discovery_timeout = discovery;
        self.mirror_timeout = mirror;
        self
    }

    pub fn with_target_height(mut self, height: u32) -> Self {
        self.target_height = height;
        self
    }

    pub fn with_decipher(mut self, helper: DecipherHelper) -> Self {
        self.decipher = Some(helper);
        self
    }

    /// Canonical targets in configured order, then the shuffled mirrors
    pub fn targets(&self) -> Vec<ProbeTarget> {
        let mut mirrors: Vec<ProbeTarget> = self
            .piped
            .iter()
            .chain(self.invidious.iter())
            .cloned()
            .map(ProbeTarget::Mirror)
            .collect();
        mirrors.shuffle(&mut rand::thread_rng());

        self.profiles
            .iter()
            .copied()
            .map(ProbeTarget::Canonical)
            .chain(mirrors)
            .collect()
    }

    pub async fn probe(&self, content_id: &str, kind: MediaKind) -> Option<Candidate> {
        self.probe_detailed(content_id, kind).await.candidate
    }

    pub async fn probe_detailed(&self, content_id: &str, kind: MediaKind) -> ProbeReport {
        self.metrics.probe_requested();

        let attempt = Arc::new(Attempt {
            player: self.player.clone(),
            mirrors: self.mirrors.clone(),
            decipher: self.decipher.clone(),
            discovery_timeout: self.discovery_timeout,
            target_height: self.target_height,
        });
        // Outer bound per target; canonical requests carry the shorter discovery timeout
        let racer = FleetRacer::new(self.wave_size, self.mirror_timeout.max(self.discovery_timeout));
        let id: Arc<str> = Arc::from(content_id);

        let targets = self.targets();
        let mut waves = Vec::new();

        for (index, wave) in targets.chunks(self.wave_size).enumerate() {
            let wave_number = index + 1;
            debug!(content_id, wave = wave_number, targets = wave.len(), "Starting probe wave");

            let attempt = Arc::clone(&attempt);
            let id = Arc::clone(&id);
            let outcome = racer
                .race_wave(wave.to_vec(), move |target: ProbeTarget, _token| {
                    let attempt = Arc::clone(&attempt);
                    let id = Arc::clone(&id);
                    async move { attempt.run(&target, &id, kind).await }
                })
                .await;

            match outcome {
                RaceOutcome::Won { target, value } => {
                    info!(content_id, %kind, wave = wave_number, %target, "Probe resolved stream");
                    return ProbeReport {
                        candidate: Some(value),
                        waves,
                    };
                }
                RaceOutcome::Exhausted { failures } => {
                    waves.push(WaveReport {
                        wave: wave_number,
                        failures,
                    });
                }
            }
        }

        warn!(content_id, %kind, waves = waves.len(), "Client probe exhausted every target");
        ProbeReport {
            candidate: None,
            waves,
        }
    }
}
