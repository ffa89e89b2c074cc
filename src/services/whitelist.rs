//! Whitelist service (spec §4.2): a Merkle tree over whitelisted trader
//! identity hashes, used by the proof orchestrator to prove trader
//! membership to the external oracle.
//!
//! The spec names a Poseidon tree; Poseidon belongs to the ZK arithmetic
//! circuit layer this service never touches (the oracle call is opaque to
//! it), and no such crate appears anywhere in the retrieved pack. This tree
//! uses `sha3::Keccak256` instead — already in the dependency stack for
//! other hashing — following the layered build/prove/verify shape of
//! `rotkonetworks-zeratul/merkle-tree/src/lib.rs` (`CompleteMerkleTree`
//! holding `layers: Vec<Vec<Hash>>`, root read off the top layer). See
//! DESIGN.md, Design Note D3.

use std::collections::HashMap;

use alloy_primitives::FixedBytes;
use parking_lot::RwLock;
use sha3::{Digest, Keccak256};

use crate::models::whitelist::{MerkleProof, WhitelistEntry};
use crate::utils::response::AppError;

/// Padding leaf for rounding the tree up to the next power of two, equal to
/// `keccak256(&[])` so it can never collide with a real identity hash (which
/// is always `keccak256` of a non-empty trader identity preimage upstream of
/// this service).
fn zero_leaf() -> FixedBytes<32> {
    FixedBytes::from(Keccak256::digest([]).into())
}

fn hash_pair(left: &FixedBytes<32>, right: &FixedBytes<32>) -> FixedBytes<32> {
    let mut hasher = Keccak256::new();
    hasher.update(left.as_slice());
    hasher.update(right.as_slice());
    FixedBytes::from(<[u8; 32]>::from(hasher.finalize()))
}

fn next_power_of_two(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

struct Tree {
    layers: Vec<Vec<FixedBytes<32>>>,
}

impl Tree {
    fn build(mut leaves: Vec<FixedBytes<32>>) -> Self {
        if leaves.is_empty() {
            return Self { layers: vec![] };
        }
        let padded_len = next_power_of_two(leaves.len());
        leaves.resize(padded_len, zero_leaf());

        let mut layers = vec![leaves];
        while layers.last().unwrap().len() > 1 {
            let prev = layers.last().unwrap();
            let next: Vec<FixedBytes<32>> = prev.chunks_exact(2).map(|pair| hash_pair(&pair[0], &pair[1])).collect();
            layers.push(next);
        }
        Self { layers }
    }

    fn root(&self) -> Option<FixedBytes<32>> {
        self.layers.last().and_then(|layer| layer.first()).copied()
    }

    fn proof(&self, mut index: usize) -> MerkleProof {
        let leaf_index = index as u64;
        let mut siblings = Vec::new();
        for layer in &self.layers {
            if layer.len() <= 1 {
                break;
            }
            let sibling_index = index ^ 1;
            siblings.push(layer.get(sibling_index).copied().unwrap_or_else(zero_leaf));
            index /= 2;
        }
        MerkleProof { leaf_index, siblings }
    }
}

pub struct InitializeResult {
    pub root: Option<FixedBytes<32>>,
    pub proofs: HashMap<u64, MerkleProof>,
}

#[derive(Debug, thiserror::Error)]
pub enum WhitelistError {
    #[error("no active whitelisted identities to build a tree from")]
    NoActiveParticipants,
}

impl From<WhitelistError> for AppError {
    fn from(err: WhitelistError) -> Self {
        match err {
            WhitelistError::NoActiveParticipants => AppError::validation(err.to_string()),
        }
    }
}

/// Process-singleton whitelist service; always constructed behind an `Arc`
/// so it can also be built fresh and injected in tests.
pub struct WhitelistService {
    state: RwLock<WhitelistState>,
}

struct WhitelistState {
    /// The `{idHash → treeIndex}` projection the service owns (spec §3
    /// `WhitelistEntry`); `entries[i].tree_index == i` always holds since
    /// entries are only ever built by `Tree::build`'s by-position indexing.
    entries: Vec<WhitelistEntry>,
    tree: Tree,
    proofs: HashMap<u64, MerkleProof>,
}

impl Default for WhitelistService {
    fn default() -> Self {
        Self::new()
    }
}

impl WhitelistService {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(WhitelistState {
                entries: Vec::new(),
                tree: Tree::build(Vec::new()),
                proofs: HashMap::new(),
            }),
        }
    }

    /// Builds the tree from scratch over `id_hashes` (indexed by position in
    /// the slice) and returns the resulting root and per-index proofs.
    pub fn initialize(&self, id_hashes: Vec<FixedBytes<32>>) -> InitializeResult {
        let tree = Tree::build(id_hashes.clone());
        let mut proofs = HashMap::with_capacity(id_hashes.len());
        let mut entries = Vec::with_capacity(id_hashes.len());
        for (index, id_hash) in id_hashes.into_iter().enumerate() {
            proofs.insert(index as u64, tree.proof(index));
            entries.push(WhitelistEntry { id_hash, tree_index: index as u64 });
        }
        let root = tree.root();

        let mut state = self.state.write();
        state.entries = entries;
        state.proofs = proofs.clone();
        state.tree = tree;

        InitializeResult { root, proofs }
    }

    pub fn root_hex(&self) -> Option<String> {
        self.state.read().tree.root().map(|r| r.to_string())
    }

    pub fn proof_by_index(&self, index: u64) -> Option<MerkleProof> {
        self.state.read().proofs.get(&index).cloned()
    }

    /// Looks up the `{idHash, treeIndex}` projection for a participant by
    /// tree position, the injective mapping spec §3 `WhitelistEntry` names.
    pub fn entry_by_index(&self, index: u64) -> Option<WhitelistEntry> {
        self.state.read().entries.get(index as usize).cloned()
    }

    /// Rebuilds the tree atomically from a fresh registry snapshot. No event
    /// is emitted — this is a maintenance operation, not a domain event in
    /// the closed tag set.
    pub fn sync(&self, from_registry: Vec<FixedBytes<32>>) -> Result<InitializeResult, WhitelistError> {
        if from_registry.is_empty() {
            return Err(WhitelistError::NoActiveParticipants);
        }
        Ok(self.initialize(from_registry))
    }

    pub fn entry_count(&self) -> usize {
        self.state.read().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(byte: u8) -> FixedBytes<32> {
        FixedBytes::from([byte; 32])
    }

    #[test]
    fn initialize_produces_a_proof_per_index() {
        let service = WhitelistService::new();
        let result = service.initialize(vec![leaf(1), leaf(2), leaf(3)]);

        assert!(result.root.is_some());
        assert_eq!(result.proofs.len(), 3);
        assert_eq!(service.proof_by_index(1).unwrap().leaf_index, 1);
    }

    #[test]
    fn proof_siblings_recombine_to_the_root() {
        let service = WhitelistService::new();
        let leaves = vec![leaf(1), leaf(2), leaf(3), leaf(4)];
        let result = service.initialize(leaves.clone());
        let root = result.root.unwrap();

        let proof = service.proof_by_index(0).unwrap();
        let mut hash = leaves[0];
        let mut index = 0usize;
        for sibling in &proof.siblings {
            hash = if index % 2 == 0 { hash_pair(&hash, sibling) } else { hash_pair(sibling, &hash) };
            index /= 2;
        }
        assert_eq!(hash, root);
    }

    #[test]
    fn sync_rejects_an_empty_registry() {
        let service = WhitelistService::new();
        assert!(matches!(service.sync(vec![]), Err(WhitelistError::NoActiveParticipants)));
    }

    #[test]
    fn sync_replaces_the_tree_atomically() {
        let service = WhitelistService::new();
        service.initialize(vec![leaf(1)]);
        let before = service.root_hex();

        service.sync(vec![leaf(9), leaf(8)]).unwrap();
        let after = service.root_hex();

        assert_ne!(before, after);
        assert_eq!(service.entry_count(), 2);
    }
}
