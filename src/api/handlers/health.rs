//! `GET /health` (SPEC_FULL.md §7) — liveness plus a small operational
//! snapshot: pending match count and push-channel session/channel counts.

use std::sync::Arc;

use serde::Serialize;

use axum::extract::State;
use axum::Json;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsocketHealth {
    pub session_count: usize,
    pub channel_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub pending_matches: usize,
    pub websocket: WebsocketHealth,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.session_registry.stats();
    Json(HealthResponse {
        status: "ok",
        pending_matches: state.matching_engine.pending_count(),
        websocket: WebsocketHealth { session_count: stats.session_count, channel_count: stats.channel_count },
    })
}
