//! Chain adapter (spec §4.5): the only component that talks to the external
//! contract RPC and its Horizon-style fallback index. Every call is opaque
//! JSON-over-HTTP — the on-chain registry/orderbook/settlement/verifier
//! contracts are consumed, not reimplemented, so this module never decodes
//! an XDR blob itself, only passes it through.
//!
//! HTTP client construction follows the teacher's
//! `api/handlers/kline.rs::get_binance_klines` pattern
//! (`reqwest::Client::builder().timeout(..).build()`), generalized to a
//! long-lived client built once in [`ChainAdapter::new`] instead of per
//! call.

use std::time::Duration;

use alloy_primitives::{Address, FixedBytes};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AppConfig;
use crate::utils::response::AppError;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("chain RPC unavailable: {0}")]
    Unavailable(String),
    #[error("chain rejected the operation: {0}")]
    Rejected(String),
}

impl From<ChainError> for AppError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Unavailable(msg) => AppError::chain_unavailable(msg),
            ChainError::Rejected(msg) => AppError::chain_rejected(msg),
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::Unavailable(err.to_string())
    }
}

/// A source account's current sequence number, needed to build a
/// transaction envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainAccount {
    pub sequence: i64,
}

/// Typed scalar arguments for a contract invocation, per spec §4.5
/// "Encoding primitives": address, i128, bytes, fixed-byte-array.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContractArg {
    Address(Address),
    I128(String),
    Bytes(#[serde(with = "crate::numeric::bytes_hex")] Vec<u8>),
    Bytes32(#[serde(with = "crate::numeric::bytes32_hex")] FixedBytes<32>),
}

/// The settlement contract's `settle_trade` invocation, built from a
/// [`crate::models::settlement::PendingSettlement`] by the settlement
/// coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct ContractInvocation {
    pub contract_fn: &'static str,
    pub source_account: Address,
    pub args: Vec<ContractArg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationResult {
    pub resource_fee: u64,
    pub footprint: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub unsigned_xdr: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PreparedTransactionWire {
    unsigned_xdr: String,
    tx_hash: String,
}

/// Outcome of submitting a signed transaction (spec §4.4 `submitSettlement`).
#[derive(Debug, Clone)]
pub enum SendOutcome {
    Pending { tx_hash: String },
    Rejected { error_xdr: Option<String> },
}

#[derive(Debug, Clone, Deserialize)]
struct SendOutcomeWire {
    status: String,
    #[serde(default)]
    tx_hash: Option<String>,
    #[serde(default)]
    error_xdr: Option<String>,
}

/// A polled transaction's terminal or in-flight status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed(String),
    NotFound,
}

#[derive(Debug, Clone, Deserialize)]
struct TransactionStatusWire {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// Horizon-style fallback lookup result (spec §4.4 submitSettlement poll
/// fallback): `successful` is `None` when the index itself can't say yet.
#[derive(Debug, Clone, Deserialize)]
pub struct HorizonResult {
    pub hash: String,
    pub successful: Option<bool>,
}

pub struct ChainAdapter {
    http: reqwest::Client,
    rpc_url: String,
    horizon_url: String,
}

impl ChainAdapter {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.chain_submit_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http,
            rpc_url: config.chain_rpc_url.clone(),
            horizon_url: config.horizon_url.clone(),
        }
    }

    pub async fn get_account(&self, address: Address) -> Result<ChainAccount, ChainError> {
        let url = format!("{}/accounts/{address}", self.rpc_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "getAccount returned status {}",
                response.status()
            )));
        }
        Ok(response.json::<ChainAccount>().await?)
    }

    pub async fn simulate_transaction(&self, unsigned_xdr: &str) -> Result<SimulationResult, ChainError> {
        let url = format!("{}/simulateTransaction", self.rpc_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "transaction": unsigned_xdr }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "simulateTransaction returned status {}",
                response.status()
            )));
        }
        let sim = response.json::<SimulationResult>().await?;
        if let Some(error) = sim.error {
            return Err(ChainError::Rejected(error));
        }
        Ok(sim)
    }

    pub async fn prepare_transaction(
        &self,
        unsigned_xdr: &str,
        simulation: &SimulationResult,
    ) -> Result<PreparedTransaction, ChainError> {
        let url = format!("{}/prepareTransaction", self.rpc_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "transaction": unsigned_xdr,
                "resourceFee": simulation.resource_fee,
                "footprint": simulation.footprint,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "prepareTransaction returned status {}",
                response.status()
            )));
        }
        let wire = response.json::<PreparedTransactionWire>().await?;
        Ok(PreparedTransaction { unsigned_xdr: wire.unsigned_xdr, tx_hash: wire.tx_hash })
    }

    pub async fn send_transaction(&self, signed_xdr: &str) -> Result<SendOutcome, ChainError> {
        let url = format!("{}/sendTransaction", self.rpc_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "transaction": signed_xdr }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "sendTransaction returned status {}",
                response.status()
            )));
        }
        let wire = response.json::<SendOutcomeWire>().await?;
        match wire.status.as_str() {
            "PENDING" => Ok(SendOutcome::Pending {
                tx_hash: wire.tx_hash.ok_or_else(|| {
                    ChainError::Unavailable("PENDING response missing tx_hash".into())
                })?,
            }),
            _ => Ok(SendOutcome::Rejected { error_xdr: wire.error_xdr }),
        }
    }

    pub async fn get_transaction(&self, tx_hash: &str) -> Result<TransactionStatus, ChainError> {
        let url = format!("{}/getTransaction/{tx_hash}", self.rpc_url);
        let response = self.http.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(TransactionStatus::NotFound);
        }
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "getTransaction returned status {}",
                response.status()
            )));
        }
        let wire = response.json::<TransactionStatusWire>().await?;
        Ok(match wire.status.as_str() {
            "SUCCESS" => TransactionStatus::Success,
            "PENDING" | "NOT_FOUND" => TransactionStatus::Pending,
            other => TransactionStatus::Failed(wire.error.unwrap_or_else(|| other.to_string())),
        })
    }

    /// Reads the registry contract's currently active participant identity
    /// hashes. Not one of the four named operations in spec §4.5, but the
    /// whitelist service's `sync` (§4.2) explicitly calls "the chain
    /// adapter to read active participants from the registry contract" —
    /// this is that call, following the same opaque JSON-over-HTTP shape as
    /// every other adapter method.
    pub async fn get_registry_participants(&self) -> Result<Vec<FixedBytes<32>>, ChainError> {
        let url = format!("{}/registry/participants", self.rpc_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "registry/participants returned status {}",
                response.status()
            )));
        }
        #[derive(Deserialize)]
        struct RegistryParticipant {
            #[serde(with = "crate::numeric::bytes32_hex")]
            id_hash: FixedBytes<32>,
        }
        let participants: Vec<RegistryParticipant> = response.json().await?;
        Ok(participants.into_iter().map(|p| p.id_hash).collect())
    }

    /// Horizon-style fallback lookup used only when `get_transaction`
    /// polling itself raises (spec §4.4).
    pub async fn get_transaction_via_public_index(
        &self,
        tx_hash: &str,
    ) -> Result<HorizonResult, ChainError> {
        let url = format!("{}/transactions/{tx_hash}", self.horizon_url);
        let response = self.http.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(HorizonResult { hash: tx_hash.to_string(), successful: None });
        }
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "Horizon lookup returned status {}",
                response.status()
            )));
        }
        Ok(response.json::<HorizonResult>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_arg_serializes_with_tagged_type() {
        let arg = ContractArg::I128("1000000".to_string());
        let json = serde_json::to_value(&arg).unwrap();
        assert_eq!(json["type"], "i128");
        assert_eq!(json["value"], "1000000");
    }
}
