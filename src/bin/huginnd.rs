//! huginnd: the Huginn daemon.
//!
//! Serves the [`SpeechGateway`](huginn::SpeechGateway) over HTTP in front of
//! an inference worker, so every client shares one synthesis cache.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use huginn::server::config::Config;
use huginn::server::{AppState, router};
use huginn::{Huginn, HuginnError, SpeechGateway};

/// Huginn daemon, a cached text-to-speech service.
#[derive(Parser)]
#[command(name = "huginnd")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Huginn speech synthesis cache daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HUGINN_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Override the bind address from the config file.
    #[arg(short, long)]
    address: Option<String>,

    /// Override the inference worker URL from the config file.
    #[arg(long, env = "HUGINN_BACKEND_URL")]
    backend_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: info for the daemon; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(url) = args.backend_url {
        config.backend.base_url = url;
    }

    let gateway = build_gateway(&config)?;

    // Parse address
    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| HuginnError::Configuration(format!("Invalid address: {e}")))?;

    info!(
        version = huginn::version_string(),
        %addr,
        backend = %config.backend.base_url,
        "huginnd starting"
    );

    let state = AppState::new(
        Arc::new(gateway),
        config.server.limits.max_concurrent_requests,
        config.request_timeout(),
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("huginnd stopped");
    Ok(())
}

/// Build a [`SpeechGateway`] from configuration.
fn build_gateway(config: &Config) -> Result<SpeechGateway, HuginnError> {
    Huginn::builder()
        .remote(config.remote_config())
        .cache(config.cache_config())
        .request_limits(config.request_limits())
        .build()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
