//! The settlement surface from spec §6/§4.4: building and inspecting a
//! trade's transaction, collecting both parties' signatures, submitting,
//! and the read-only status endpoints. Every handler parses its `matchId`
//! path segment the same way the rest of the crate renders one — 32-byte
//! hex — and maps [`SettlementError`] through its `AppError` `From` impl
//! rather than matching on it here.

use std::sync::Arc;

use alloy_primitives::{Address, FixedBytes};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::settlement::PendingSettlement;
use crate::services::settlement::{PrepareData, Role, SigningStatus};
use crate::utils::response::AppError;
use crate::AppState;

fn parse_match_id(raw: &str) -> Result<FixedBytes<32>, AppError> {
    raw.parse::<FixedBytes<32>>()
        .map_err(|_| AppError::validation("matchId must be a 32-byte hex value"))
}

pub async fn pending(State(state): State<Arc<AppState>>) -> Json<Vec<PendingSettlement>> {
    Json(state.settlement.all())
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub ready: usize,
    pub awaiting_signatures: usize,
    pub submitted: usize,
    pub confirmed: usize,
    pub failed: usize,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.settlement.get_stats();
    Json(StatsResponse {
        ready: stats["ready"],
        awaiting_signatures: stats["awaiting_signatures"],
        submitted: stats["submitted"],
        confirmed: stats["confirmed"],
        failed: stats["failed"],
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderSettlement {
    #[serde(flatten)]
    pub settlement: PendingSettlement,
    pub role: Role,
}

pub async fn for_trader(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<Vec<TraderSettlement>>, AppError> {
    let address: Address = address
        .parse()
        .map_err(|_| AppError::validation("address must be a hex-encoded 20-byte address"))?;

    let settlements = state
        .settlement
        .settlements_for_trader(address)
        .into_iter()
        .map(|(settlement, role)| TraderSettlement { settlement, role })
        .collect();
    Ok(Json(settlements))
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
) -> Result<Json<PendingSettlement>, AppError> {
    let match_id = parse_match_id(&match_id)?;
    state
        .settlement
        .get(match_id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("settlement not found"))
}

pub async fn signing_status(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
) -> Result<Json<SigningStatus>, AppError> {
    let match_id = parse_match_id(&match_id)?;
    Ok(Json(state.settlement.get_signing_status(match_id)?))
}

pub async fn prepare(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
) -> Result<Json<PrepareData>, AppError> {
    let match_id = parse_match_id(&match_id)?;
    Ok(Json(state.settlement.prepare_settlement_data(match_id)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTxRequest {
    pub source_account: Address,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTxResponse {
    pub tx_xdr: String,
}

pub async fn build_tx(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    Json(request): Json<BuildTxRequest>,
) -> Result<Json<BuildTxResponse>, AppError> {
    let match_id = parse_match_id(&match_id)?;
    let tx_xdr = state
        .settlement
        .build_settlement_transaction(match_id, request.source_account)
        .await?;
    Ok(Json(BuildTxResponse { tx_xdr }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub signer_address: Address,
    pub signed_tx_xdr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub success: bool,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

pub async fn sign(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    Json(request): Json<SignRequest>,
) -> Result<Json<SignResponse>, AppError> {
    let match_id = parse_match_id(&match_id)?;
    let outcome = state
        .settlement
        .add_signature(match_id, request.signer_address, request.signed_tx_xdr)
        .await?;

    Ok(Json(SignResponse {
        success: outcome.error.is_none(),
        complete: outcome.complete,
        message: outcome.complete.then(|| "signature recorded, settlement submitted".to_string()),
        error: outcome.error,
        tx_hash: outcome.tx_hash,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub signed_tx_xdr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let match_id = parse_match_id(&match_id)?;
    let outcome = state.settlement.submit_settlement(match_id, request.signed_tx_xdr).await?;
    Ok(Json(SubmitResponse { success: outcome.success, tx_hash: outcome.tx_hash, error: outcome.error }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub tx_hash: String,
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let match_id = parse_match_id(&match_id)?;
    state.settlement.mark_confirmed(match_id, request.tx_hash)?;
    Ok(Json(serde_json::json!({ "success": true })))
}
