//! Process-wide counters for the resolution pipeline

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    resolutions: AtomicU64,
    phases_failed: AtomicU64,
    extractions_exhausted: AtomicU64,
    relays_started: AtomicU64,
    relays_failed: AtomicU64,
    bytes_relayed: AtomicU64,
    probes: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution_succeeded(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "resolutions", "Metric incremented");
    }

    pub fn phase_failed(&self) {
        self.phases_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "phases_failed", "Metric incremented");
    }

    pub fn extraction_exhausted(&self) {
        self.extractions_exhausted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "extractions_exhausted", "Metric incremented");
    }

    pub fn relay_started(&self) {
        self.relays_started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "relays_started", "Metric incremented");
    }

    pub fn relay_failed(&self) {
        self.relays_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "relays_failed", "Metric incremented");
    }

    pub fn probe_requested(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "probes", "Metric incremented");
    }

    /// Called per relayed chunk, so no log line here
    pub fn add_bytes_relayed(&self, bytes: u64) {
        self.bytes_relayed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            phases_failed: self.phases_failed.load(Ordering::Relaxed),
            extractions_exhausted: self.extractions_exhausted.load(Ordering::Relaxed),
            relays_started: self.relays_started.load(Ordering::Relaxed),
            relays_failed: self.relays_failed.load(Ordering::Relaxed),
            bytes_relayed: self.bytes_relayed.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub resolutions: u64,
    pub phases_failed: u64,
    pub extractions_exhausted: u64,
    pub relays_started: u64,
    pub relays_failed: u64,
    pub bytes_relayed: u64,
    pub probes: u64,
}
