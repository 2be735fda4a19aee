//! Transparency Rating Service
//!
//! Rates how transparent a web3 project's public presence is, lets a
//! connected wallet vote on its legitimacy, and attests both on-chain.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  TRANSPARENCY RATING                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌────────────┐  ┌─────────────────────────┐  │
//! │  │  API      │  │  Session   │  │  Analyzer               │  │
//! │  │  (Axum)   │─▶│  Workflow  │─▶│  (heuristic | network)  │  │
//! │  └───────────┘  └─────┬──────┘  └─────────────────────────┘  │
//! │                       ▼                                      │
//! │                ┌─────────────┐                               │
//! │                │ Attestation │──▶ Solana RPC / memory ledger │
//! │                └─────────────┘                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod middleware;
pub mod models;
pub mod store;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

use config::Config;
use logic::analyzer::Analyzer;
use logic::ledger::AttestationClient;
use store::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    pub analyzer: Arc<dyn Analyzer>,
    pub attestation: AttestationClient,
}

impl AppState {
    pub fn new(
        config: Config,
        analyzer: Arc<dyn Analyzer>,
        attestation: AttestationClient,
    ) -> Self {
        let sessions = SessionStore::with_limits(
            chrono::Duration::seconds(config.session_ttl_secs),
            config.max_sessions,
        );
        Self {
            config,
            sessions,
            analyzer,
            attestation,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    // Routes that need no wallet, or check it through the session
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/assess", post(handlers::assess::preview))
        .route("/api/v1/sessions", post(handlers::sessions::create))
        .route("/api/v1/sessions/:id", get(handlers::sessions::get))
        .route("/api/v1/sessions/:id/analyze", post(handlers::sessions::analyze))
        .route("/api/v1/sessions/:id/reset", post(handlers::sessions::reset))
        .route("/api/v1/sessions/:id/recover", post(handlers::sessions::recover));

    // Ledger-backed steps require a connected wallet
    let wallet_routes = Router::new()
        .route("/api/v1/sessions/:id/vote", post(handlers::sessions::vote))
        .route("/api/v1/sessions/:id/vote/submit", post(handlers::sessions::submit_vote))
        .route("/api/v1/sessions/:id/verify", post(handlers::sessions::verify))
        .layer(axum_middleware::from_fn(middleware::wallet::require_wallet));

    Router::new()
        .merge(public_routes)
        .merge(wallet_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
