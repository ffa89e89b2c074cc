//! `GET /api/matches`, `/api/matches/pending`, `/api/matches/settlements`,
//! and `POST /api/matches/process` (spec §6). These expose the matcher's
//! completed-match log and the proof orchestrator's drain cycle; no new
//! domain logic lives here.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::models::order_match::Match;
use crate::models::proof::ProofResult;
use crate::utils::response::AppError;
use crate::AppState;

pub async fn completed(State(state): State<Arc<AppState>>) -> Json<Vec<Match>> {
    Json(state.matching_engine.completed())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCountResponse {
    pub pending_count: usize,
}

pub async fn pending(State(state): State<Arc<AppState>>) -> Json<PendingCountResponse> {
    Json(PendingCountResponse { pending_count: state.matching_engine.pending_count() })
}

pub async fn settlements_log(State(state): State<Arc<AppState>>) -> Json<Vec<ProofResult>> {
    Json(state.orchestrator.settlements_log())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ProofResult>,
}

pub async fn process(State(state): State<Arc<AppState>>) -> Result<Json<ProcessResponse>, AppError> {
    let summary = state.orchestrator.process().await;
    Ok(Json(ProcessResponse {
        processed: summary.processed,
        successful: summary.successful,
        failed: summary.failed,
        results: summary.results,
    }))
}
