//! Client for the external ZK proof oracle (spec §1 "external collaborator"
//! / §4.3). This module never runs a circuit or verifies a proof — it only
//! shapes requests/responses across the HTTP boundary, following the same
//! `reqwest::Client` construction the teacher used for its external Binance
//! calls (`api/handlers/kline.rs`).

use std::time::Duration;

use alloy_primitives::{Address, FixedBytes, U256};
use serde::{Deserialize, Serialize};

use crate::models::order::Side;
use crate::models::proof::ProofResult;
use crate::models::whitelist::MerkleProof;
use crate::numeric::{bytes32_hex, u256_decimal};
use crate::utils::response::AppError;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("proof oracle unavailable: {0}")]
    Unavailable(String),
    #[error("proof oracle raised: {0}")]
    Raised(String),
}

impl From<OracleError> for AppError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Unavailable(msg) | OracleError::Raised(msg) => AppError::oracle_failure(msg),
        }
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCommitmentRequest {
    pub asset_address: Address,
    pub side: Side,
    #[serde(with = "u256_decimal")]
    pub quantity: U256,
    #[serde(with = "u256_decimal")]
    pub price: U256,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCommitmentResponse {
    #[serde(with = "bytes32_hex")]
    pub commitment: FixedBytes<32>,
    #[serde(with = "u256_decimal")]
    pub secret: U256,
    #[serde(with = "u256_decimal")]
    pub nonce: U256,
    #[serde(with = "bytes32_hex")]
    pub asset_hash: FixedBytes<32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashAssetRequest {
    asset_address: Address,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HashAssetResponse {
    #[serde(with = "bytes32_hex")]
    asset_hash: FixedBytes<32>,
}

/// Everything the orchestrator hands the oracle for one match (spec §4.3
/// step 4): both Merkle proofs, both secrets/nonces, both commitments, the
/// asset hash, execution quantity/price, and the whitelist root.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    #[serde(with = "bytes32_hex")]
    pub match_id: FixedBytes<32>,
    pub buyer_merkle_proof: MerkleProof,
    pub seller_merkle_proof: MerkleProof,
    #[serde(with = "u256_decimal")]
    pub buyer_secret: U256,
    #[serde(with = "u256_decimal")]
    pub buyer_nonce: U256,
    #[serde(with = "u256_decimal")]
    pub seller_secret: U256,
    #[serde(with = "u256_decimal")]
    pub seller_nonce: U256,
    #[serde(with = "bytes32_hex")]
    pub buyer_commitment: FixedBytes<32>,
    #[serde(with = "bytes32_hex")]
    pub seller_commitment: FixedBytes<32>,
    #[serde(with = "bytes32_hex")]
    pub asset_hash: FixedBytes<32>,
    #[serde(with = "u256_decimal")]
    pub execution_quantity: U256,
    #[serde(with = "u256_decimal")]
    pub execution_price: U256,
    #[serde(with = "bytes32_hex")]
    pub whitelist_root: FixedBytes<32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofResponseWire {
    #[serde(with = "bytes32_hex")]
    match_id: FixedBytes<32>,
    #[serde(with = "crate::numeric::bytes_hex")]
    proof: Vec<u8>,
    #[serde(with = "crate::numeric::bytes_hex")]
    public_signals: Vec<u8>,
    #[serde(with = "bytes32_hex")]
    nullifier_hash: FixedBytes<32>,
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl From<ProofResponseWire> for ProofResult {
    fn from(wire: ProofResponseWire) -> Self {
        ProofResult {
            match_id: wire.match_id,
            proof: wire.proof,
            public_signals: wire.public_signals,
            nullifier_hash: wire.nullifier_hash,
            success: wire.success,
            error: wire.error,
        }
    }
}

pub struct ProofOracleClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProofOracleClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self { http, base_url: base_url.into() }
    }

    pub async fn generate_commitment(
        &self,
        request: GenerateCommitmentRequest,
    ) -> Result<GenerateCommitmentResponse, OracleError> {
        let url = format!("{}/commitment/generate", self.base_url);
        let response = self.http.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(OracleError::Raised(format!(
                "commitment/generate returned status {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    pub async fn hash_asset(&self, asset_address: Address) -> Result<FixedBytes<32>, OracleError> {
        let url = format!("{}/commitment/hash-asset", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&HashAssetRequest { asset_address })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(OracleError::Raised(format!(
                "commitment/hash-asset returned status {}",
                response.status()
            )));
        }
        Ok(response.json::<HashAssetResponse>().await?.asset_hash)
    }

    /// Drives the oracle's Groth16 witness+proof generation for one match.
    /// A non-2xx or malformed response becomes a failed [`ProofResult`]
    /// rather than propagating — the orchestrator always gets a result it
    /// can hand to the event bus and, on success, the settlement
    /// coordinator.
    pub async fn generate_proof(&self, request: ProofRequest) -> ProofResult {
        let match_id = request.match_id;
        match self.generate_proof_inner(request).await {
            Ok(result) => result,
            Err(err) => ProofResult::failed(match_id, err.to_string()),
        }
    }

    async fn generate_proof_inner(&self, request: ProofRequest) -> Result<ProofResult, OracleError> {
        let url = format!("{}/proof/generate", self.base_url);
        let response = self.http.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(OracleError::Raised(format!(
                "proof/generate returned status {}",
                response.status()
            )));
        }
        let wire: ProofResponseWire = response.json().await?;
        Ok(wire.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_constructs_with_trimmed_base_url() {
        let client = ProofOracleClient::new("http://localhost:4000");
        assert_eq!(client.base_url, "http://localhost:4000");
    }
}
