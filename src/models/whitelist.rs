use alloy_primitives::FixedBytes;
use serde::{Deserialize, Serialize};

use crate::numeric::bytes32_hex;

/// A single whitelisted identity: its leaf hash and position in the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistEntry {
    #[serde(with = "bytes32_hex")]
    pub id_hash: FixedBytes<32>,
    pub tree_index: u64,
}

/// Sibling path from a leaf up to the root, plus the directions needed to
/// recombine them (`true` = sibling is on the right).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    pub leaf_index: u64,
    #[serde(with = "crate::numeric::bytes32_hex_vec")]
    pub siblings: Vec<FixedBytes<32>>,
}
