//! Proxies the private-order commitment endpoints through to the external
//! proof oracle (spec §6). The engine never computes a commitment itself —
//! it only forwards the request and hands the typed response back.

use std::sync::Arc;

use alloy_primitives::{Address, FixedBytes};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::numeric::bytes32_hex;
use crate::services::proof_oracle::{GenerateCommitmentRequest, GenerateCommitmentResponse};
use crate::utils::response::AppError;
use crate::AppState;

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateCommitmentRequest>,
) -> Result<Json<GenerateCommitmentResponse>, AppError> {
    Ok(Json(state.proof_oracle.generate_commitment(request).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashAssetBody {
    pub asset_address: Address,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashAssetResponse {
    #[serde(with = "bytes32_hex")]
    pub asset_hash: FixedBytes<32>,
}

pub async fn hash_asset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HashAssetBody>,
) -> Result<Json<HashAssetResponse>, AppError> {
    let asset_hash = state.proof_oracle.hash_asset(body.asset_address).await?;
    Ok(Json(HashAssetResponse { asset_hash }))
}
