//! `POST /api/whitelist/sync` and `GET /api/whitelist/status` (spec §6 /
//! §4.2). `sync` pulls the active participant set from the chain adapter's
//! registry read and rebuilds the Merkle tree in one atomic swap; `status`
//! is a read-only peek at the current root and entry count.

use std::sync::Arc;

use serde::Serialize;

use axum::extract::State;
use axum::Json;

use crate::utils::response::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub root: Option<String>,
    pub entry_count: usize,
}

pub async fn sync(State(state): State<Arc<AppState>>) -> Result<Json<SyncResponse>, AppError> {
    let participants = state.chain.get_registry_participants().await?;
    let result = state.whitelist.sync(participants)?;

    Ok(Json(SyncResponse {
        root: result.root.map(|r| r.to_string()),
        entry_count: state.whitelist.entry_count(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub root: Option<String>,
    pub entry_count: usize,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse { root: state.whitelist.root_hex(), entry_count: state.whitelist.entry_count() })
}
