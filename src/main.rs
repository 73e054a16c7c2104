mod cli;

use clap::Parser;
use cli::{AcquireArgs, Cli, Commands, ResolveArgs};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tunebox::config::Config;
use tunebox::net::{HttpClient, HttpConfig};
use tunebox::observability::Metrics;
use tunebox::probe::ClientProbe;
use tunebox::resolver::PhaseChain;
use tunebox::session::{Acquirer, SessionController, SessionStatus};
use tunebox::tunnel::StreamTunnel;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tunebox=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => tunebox::api::run(args.address).await?,
        Commands::Resolve(args) => resolve(args).await?,
        Commands::Acquire(args) => acquire(args).await?,
    }

    Ok(())
}

async fn resolve(args: ResolveArgs) -> Result<(), AnyError> {
    let config = Config::load()?;
    let http = HttpClient::new(HttpConfig::from(&config.http))?;
    let chain = PhaseChain::from_config(
        &config,
        &config.mirror_table(),
        http,
        Arc::new(Metrics::new()),
    );

    let kinds = args.kind.expand();
    let runs = join_all(kinds.iter().map(|&k| chain.run(&args.id, k))).await;

    let mut output = serde_json::Map::new();
    for (&kind, run) in kinds.iter().zip(runs) {
        let entry = match run.into_result() {
            Ok(candidate) => json!({
                "url": candidate.source_url,
                "title": candidate.title,
                "origin": candidate.origin,
            }),
            Err(e) => json!({ "error": e.to_string() }),
        };
        output.insert(kind.to_string(), entry);
    }
    output.insert(
        "fallbackUrl".to_string(),
        json!(config.fallback.link_for(&args.id)),
    );

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn acquire(args: AcquireArgs) -> Result<(), AnyError> {
    let config = Config::load()?;
    let http = HttpClient::new(HttpConfig::from(&config.http))?;
    let table = config.mirror_table();
    let metrics = Arc::new(Metrics::new());

    let chain = Arc::new(PhaseChain::from_config(
        &config,
        &table,
        http.clone(),
        Arc::clone(&metrics),
    ));
    let tunnel = StreamTunnel::new(
        http.clone(),
        chain,
        config.timeouts.tunnel(),
        Arc::clone(&metrics),
    );
    let probe = ClientProbe::from_config(&config, &table, http, Arc::clone(&metrics));
    let controller = Arc::new(SessionController::new());
    let acquirer = Acquirer::new(
        Arc::clone(&controller),
        probe,
        tunnel,
        config.fallback.clone(),
    );

    let mut updates = controller.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let session = updates.borrow_and_update().clone();
            info!(status = %session.status, progress = session.progress, "Session update");
            if session.status.is_terminal() {
                break;
            }
        }
    });

    let session = acquirer.acquire(&args.id, args.kind).await?;
    watcher.abort();

    if session.status == SessionStatus::Fallback {
        let link = session.fallback_url.unwrap_or_default();
        let reason = session.error.unwrap_or_default();
        return Err(format!("acquisition failed ({reason}); try {link}").into());
    }

    tokio::fs::create_dir_all(&args.out).await?;
    for media in session.results.iter() {
        let path = args.out.join(&media.filename);
        tokio::fs::write(&path, &media.data).await?;
        println!("{} ({} bytes, via {})", path.display(), media.size, media.origin);
    }

    Ok(())
}
