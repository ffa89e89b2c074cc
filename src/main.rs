use std::net::SocketAddr;
use std::sync::Arc;

use alloy_primitives::FixedBytes;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod api;
mod config;
mod events;
mod logging;
mod models;
mod numeric;
mod services;
mod utils;
mod websocket;

use crate::config::AppConfig;
use crate::events::EventBus;
use crate::services::{ChainAdapter, MatchingEngine, ProofOracleClient, ProofOrchestrator, SettlementCoordinator, WhitelistService};
use crate::websocket::SessionRegistry;

/// Shared application state handed to every handler via axum's `State`
/// extractor, constructed once at startup in dependency order: event bus
/// first (nothing else can emit without it), then the components that only
/// read or write their own state, then the orchestrator and settlement
/// coordinator that depend on all of them.
pub struct AppState {
    pub config: AppConfig,
    pub event_bus: Arc<EventBus>,
    pub matching_engine: Arc<MatchingEngine>,
    pub whitelist: Arc<WhitelistService>,
    pub proof_oracle: Arc<ProofOracleClient>,
    pub chain: Arc<ChainAdapter>,
    pub orchestrator: Arc<ProofOrchestrator>,
    pub settlement: Arc<SettlementCoordinator>,
    pub session_registry: Arc<SessionRegistry>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;
    logging::init(&config);

    tracing::info!("Starting dark pool backend v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(port = config.port, chain_rpc_url = %config.chain_rpc_url, "configuration loaded");

    let event_bus = Arc::new(EventBus::new());
    let chain = Arc::new(ChainAdapter::new(&config));
    let proof_oracle = Arc::new(ProofOracleClient::new(config.oracle_url.clone()));
    let whitelist = Arc::new(WhitelistService::new());

    if let Some(count) = load_whitelist_seed(&config, &whitelist) {
        tracing::info!(count, "whitelist seeded from configured file");
    }

    let matching_engine = Arc::new(MatchingEngine::new(event_bus.clone()));
    let settlement = Arc::new(SettlementCoordinator::new(chain.clone(), event_bus.clone(), &config));
    let orchestrator = Arc::new(ProofOrchestrator::new(
        matching_engine.clone(),
        whitelist.clone(),
        proof_oracle.clone(),
        settlement.clone(),
        event_bus.clone(),
    ));

    let session_registry = Arc::new(SessionRegistry::new());
    websocket::bridge::wire(&event_bus, session_registry.clone());
    tracing::info!("event bus wired to push channel");

    let state = Arc::new(AppState {
        config: config.clone(),
        event_bus,
        matching_engine,
        whitelist,
        proof_oracle,
        chain,
        orchestrator,
        settlement,
        session_registry,
    });

    let app = Router::new()
        .route("/health", get(api::handlers::health::health))
        .nest(
            "/api",
            api::routes::create_router().layer(axum::middleware::from_fn(api::middleware::log_request_body)),
        )
        .nest("/ws", websocket::routes::create_router())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Loads the optional whitelist seed file named by `config.whitelist_seed_path`:
/// a JSON array of 32-byte hex identity hashes, initializing the Merkle tree
/// before the server starts accepting traffic. Returns the seeded entry
/// count, or `None` if no path was configured or the file could not be read.
fn load_whitelist_seed(config: &AppConfig, whitelist: &WhitelistService) -> Option<usize> {
    let path = config.whitelist_seed_path.as_ref()?;
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(path, %err, "failed to read whitelist seed file");
            return None;
        }
    };

    #[derive(serde::Deserialize)]
    #[serde(transparent)]
    struct SeedFile(#[serde(with = "crate::numeric::bytes32_hex_vec")] Vec<FixedBytes<32>>);

    let hashes = match serde_json::from_str::<SeedFile>(&contents) {
        Ok(SeedFile(hashes)) => hashes,
        Err(err) => {
            tracing::warn!(path, %err, "failed to parse whitelist seed file");
            return None;
        }
    };

    let count = hashes.len();
    whitelist.initialize(hashes);
    Some(count)
}
