//! Bounded "first success wins" racing over a pool of targets.
//!
//! Every selected target gets its own spawned probe feeding a single-slot
//! channel. The first `Ok` ends the race and cancels the shared token, so
//! probes that have not started yet skip their work. Probes already in
//! flight run to completion (or their own timeout) and their results are
//! dropped with the channel.

use futures::FutureExt;
use rand::seq::SliceRandom;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::traits::AdapterError;

/// How a race ended
#[derive(Debug)]
pub enum RaceOutcome<E, T> {
    Won { target: E, value: T },
    /// Exactly one entry per consulted target
    Exhausted { failures: Vec<String> },
}

impl<E, T> RaceOutcome<E, T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            RaceOutcome::Won { value, .. } => Some(value),
            RaceOutcome::Exhausted { .. } => None,
        }
    }

    pub fn is_won(&self) -> bool {
        matches!(self, RaceOutcome::Won { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FleetRacer {
    width: usize,
    probe_timeout: Duration,
}

impl FleetRacer {
    pub fn new(width: usize, probe_timeout: Duration) -> Self {
        Self {
            width: width.max(1),
            probe_timeout,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Uniform shuffle, then keep the first `width` targets
    pub fn select<E: Clone>(&self, targets: &[E]) -> Vec<E> {
        let mut selected = targets.to_vec();
        selected.shuffle(&mut rand::thread_rng());
        selected.truncate(self.width);
        selected
    }

    /// Shuffle and truncate `targets`, then race the subset
    pub async fn race<E, T, F, Fut>(&self, targets: &[E], probe: F) -> RaceOutcome<E, T>
    where
        E: Clone + Display + Send + 'static,
        T: Send + 'static,
        F: Fn(E, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AdapterError>> + Send + 'static,
    {
        let selected = self.select(targets);
        self.race_wave(selected, probe).await
    }

    /// Race exactly the given targets, in no particular order
    pub async fn race_wave<E, T, F, Fut>(&self, targets: Vec<E>, probe: F) -> RaceOutcome<E, T>
    where
        E: Clone + Display + Send + 'static,
        T: Send + 'static,
        F: Fn(E, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AdapterError>> + Send + 'static,
    {
        if targets.is_empty() {
            return RaceOutcome::Exhausted {
                failures: Vec::new(),
            };
        }

        let token = CancellationToken::new();
        let probe = Arc::new(probe);
        let (tx, mut rx) = mpsc::channel::<(E, Result<T, String>)>(1);

        for target in targets {
            let tx = tx.clone();
            let token = token.clone();
            let probe = Arc::clone(&probe);
            let timeout = self.probe_timeout;

            tokio::spawn(async move {
                if token.is_cancelled() {
                    return;
                }

                let attempt = AssertUnwindSafe(probe(target.clone(), token.clone())).catch_unwind();
                let result = match tokio::time::timeout(timeout, attempt).await {
                    Ok(Ok(Ok(value))) => Ok(value),
                    Ok(Ok(Err(e))) => Err(e.to_string()),
                    Ok(Err(_)) => Err("probe panicked".to_string()),
                    Err(_) => Err(AdapterError::Timeout(timeout).to_string()),
                };

                // Receiver is gone once someone else has won
                let _ = tx.send((target, result)).await;
            });
        }
        drop(tx);

        let mut failures = Vec::new();
        while let Some((target, result)) = rx.recv().await {
            match result {
                Ok(value) => {
                    token.cancel();
                    debug!(%target, failed_before = failures.len(), "Race won");
                    return RaceOutcome::Won { target, value };
                }
                Err(error) => {
                    debug!(%target, %error, "Race entrant failed");
                    failures.push(format!("{target}: {error}"));
                }
            }
        }

        RaceOutcome::Exhausted { failures }
    }
}
