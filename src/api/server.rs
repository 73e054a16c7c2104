use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{
    services::{health, resolve_get, resolve_post},
    state::AppState,
};
use crate::config::Config;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes and middleware around a prepared state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/resolve", get(resolve_get).post(resolve_post))
        .route("/health", get(health))
        .with_state(state)
        // Automatically decompress gzip request bodies
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        // Browser callers consume `action=proxy` cross-origin
        .layer(CorsLayer::permissive())
}

/// The command-line address wins over the configured one
pub fn bind_address(cli_address: Option<SocketAddr>, config: &Config) -> SocketAddr {
    cli_address.unwrap_or(config.server.bind_addr)
}

pub async fn run(cli_address: Option<SocketAddr>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {}", e))?;
    let address = bind_address(cli_address, &config);

    let mirrors = config.mirror_table();
    info!(
        piped = mirrors.piped.len(),
        invidious = mirrors.invidious.len(),
        race_width = config.fleet.race_width,
        "Mirror fleets ready"
    );

    let state = AppState::from_config(config)
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "tunebox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address_prefers_command_line() {
        let mut config = Config::default();
        config.server.bind_addr = SocketAddr::from(([127, 0, 0, 1], 9090));

        assert_eq!(bind_address(None, &config).to_string(), "127.0.0.1:9090");

        let explicit = SocketAddr::from(([0, 0, 0, 0], 3000));
        assert_eq!(bind_address(Some(explicit), &config), explicit);
    }
}
