//! Transparency Rating Server
//!
//! Loads configuration, builds the analyzer and attestation client selected
//! by it, and serves the HTTP API.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transparency_rating::{
    config::Config,
    constants, create_router,
    logic::{analyzer::build_analyzer, ledger::build_attestation_client},
    store, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "transparency_rating=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Transparency Rating Server starting...");
    tracing::info!("Network: {} ({})", config.network, config.rpc_url);
    tracing::info!("Analyzer: {:?}", config.analyzer_mode);
    if config.is_production() && config.uses_local_ledger() {
        tracing::warn!("Production environment is using the in-memory ledger");
    }

    let analyzer = build_analyzer(&config).context("Failed to build analyzer")?;
    let attestation =
        build_attestation_client(&config).context("Failed to build attestation client")?;

    // Build application state
    let state = AppState::new(config.clone(), analyzer, attestation);

    // Evict idle sessions in the background
    tokio::spawn(store::sweep_loop(
        state.sessions.clone(),
        Duration::from_secs(constants::SESSION_SWEEP_INTERVAL_SECS),
    ));
    tracing::info!(
        "Sessions: idle TTL {}s, capacity {}",
        config.session_ttl_secs,
        config.max_sessions
    );

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
