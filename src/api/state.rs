use std::sync::Arc;

use crate::config::Config;
use crate::net::{FetchError, HttpClient, HttpConfig};
use crate::observability::Metrics;
use crate::resolver::PhaseChain;
use crate::tunnel::StreamTunnel;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chain: Arc<PhaseChain>,
    pub tunnel: StreamTunnel,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire a state around an already built chain; the chain's metrics are shared
    pub fn new(config: Config, chain: PhaseChain, http: HttpClient) -> Self {
        let metrics = Arc::clone(chain.metrics());
        let chain = Arc::new(chain);
        let tunnel = StreamTunnel::new(
            http,
            Arc::clone(&chain),
            config.timeouts.tunnel(),
            Arc::clone(&metrics),
        );

        Self {
            config: Arc::new(config),
            chain,
            tunnel,
            metrics,
        }
    }

    /// Production wiring: default four-phase chain over the configured mirrors
    pub fn from_config(config: Config) -> Result<Self, FetchError> {
        let http = HttpClient::new(HttpConfig::from(&config.http))?;
        let metrics = Arc::new(Metrics::new());
        let chain = PhaseChain::from_config(&config, &config.mirror_table(), http.clone(), metrics);
        Ok(Self::new(config, chain, http))
    }
}
