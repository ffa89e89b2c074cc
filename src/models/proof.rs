use alloy_primitives::FixedBytes;
use serde::{Deserialize, Serialize};

use crate::numeric::{bytes32_hex, bytes_hex};

/// Outcome of handing a [`Match`](super::order_match::Match) to the external
/// proof oracle. The oracle itself — the ZK circuit execution and proof
/// verification — is out of scope; this type only carries what it returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResult {
    #[serde(with = "bytes32_hex")]
    pub match_id: FixedBytes<32>,
    #[serde(with = "bytes_hex")]
    pub proof: Vec<u8>,
    #[serde(with = "bytes_hex")]
    pub public_signals: Vec<u8>,
    #[serde(with = "bytes32_hex")]
    pub nullifier_hash: FixedBytes<32>,
    pub success: bool,
    pub error: Option<String>,
}

impl ProofResult {
    pub fn failed(match_id: FixedBytes<32>, error: impl Into<String>) -> Self {
        Self {
            match_id,
            proof: Vec::new(),
            public_signals: Vec::new(),
            nullifier_hash: FixedBytes::ZERO,
            success: false,
            error: Some(error.into()),
        }
    }
}
