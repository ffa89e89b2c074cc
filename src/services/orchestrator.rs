//! Proof orchestrator (spec §4.3): drains the matcher's queue, resolves
//! whitelist membership for both sides of a match, hands the pair to the
//! external proof oracle, and forwards a successful result to the
//! settlement coordinator. Every step emits its event synchronously in the
//! order spec §5 requires for a single `matchId`.
//!
//! Grounded in the teacher's `OrderFlowOrchestrator`
//! (`services/matching/orchestrator.rs`): a thin coordinator holding `Arc`s
//! to the components it drives, with `process()`/background-worker methods
//! rather than a monolithic handler. Unlike the teacher's orchestrator,
//! which spawns a `tokio::spawn` persistence worker per trade over a
//! `broadcast` channel, this one processes the whole queue synchronously
//! per `process()` call — spec §4.3 explicitly allows (but does not
//! require) serial processing, and does require that a single match's
//! event sequence never interleave with itself.

use std::sync::Arc;

use alloy_primitives::FixedBytes;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::events::EventBus;
use crate::models::order_match::Match;
use crate::models::proof::ProofResult;
use crate::models::whitelist::MerkleProof;
use crate::models::Event;
use crate::services::orderbook::MatchingEngine;
use crate::services::proof_oracle::{ProofOracleClient, ProofRequest};
use crate::services::settlement::SettlementCoordinator;
use crate::services::whitelist::WhitelistService;

/// Per-invocation summary returned to the REST layer's `POST
/// /api/matches/process`.
pub struct ProcessSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ProofResult>,
}

pub struct ProofOrchestrator {
    matcher: Arc<MatchingEngine>,
    whitelist: Arc<WhitelistService>,
    oracle: Arc<ProofOracleClient>,
    settlement: Arc<SettlementCoordinator>,
    event_bus: Arc<EventBus>,
    /// Append-only log of every proof attempt, successful or not, surfaced
    /// via `GET /api/matches/settlements`. Unbounded growth is intentional —
    /// see DESIGN.md, Open Question (e).
    settlements: RwLock<Vec<ProofResult>>,
}

impl ProofOrchestrator {
    pub fn new(
        matcher: Arc<MatchingEngine>,
        whitelist: Arc<WhitelistService>,
        oracle: Arc<ProofOracleClient>,
        settlement: Arc<SettlementCoordinator>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self { matcher, whitelist, oracle, settlement, event_bus, settlements: RwLock::new(Vec::new()) }
    }

    /// Drains every queued match and drives it through proof generation.
    /// Matches are processed one at a time, in queue order; nothing here
    /// prevents a caller from invoking `process()` concurrently from two
    /// requests, but each individual match's event sequence is still
    /// produced atomically within the iteration that handles it.
    pub async fn process(&self) -> ProcessSummary {
        let queued = self.matcher.drain_queue();
        let mut successful = 0usize;
        let mut failed = 0usize;
        let mut results = Vec::with_capacity(queued.len());

        for matched in queued {
            let result = self.process_one(matched).await;
            if result.success {
                successful += 1;
            } else {
                failed += 1;
            }
            results.push(result);
        }

        ProcessSummary { processed: results.len(), successful, failed, results }
    }

    async fn process_one(&self, matched: Match) -> ProofResult {
        let match_id = matched.match_id;

        let buyer_proof = self.whitelist.proof_by_index(matched.buy_order.whitelist_index);
        let seller_proof = self.whitelist.proof_by_index(matched.sell_order.whitelist_index);

        let (buyer_proof, seller_proof) = match (buyer_proof, seller_proof) {
            (Some(b), Some(s)) => (b, s),
            _ => {
                let buyer_entry = self.whitelist.entry_by_index(matched.buy_order.whitelist_index);
                let seller_entry = self.whitelist.entry_by_index(matched.sell_order.whitelist_index);
                let error = "buyer or seller whitelist index has no recorded Merkle proof".to_string();
                warn!(
                    match_id = %match_id,
                    buyer_id_hash = %buyer_entry.as_ref().map(|e| e.id_hash.to_string()).unwrap_or_else(|| "unknown".into()),
                    seller_id_hash = %seller_entry.as_ref().map(|e| e.id_hash.to_string()).unwrap_or_else(|| "unknown".into()),
                    "proof generation failed: {error}"
                );
                let result = ProofResult::failed(match_id, error.clone());
                self.event_bus.emit(Event::ProofFailed { match_id, error });
                self.settlements.write().push(result.clone());
                return result;
            }
        };

        self.event_bus.emit(Event::ProofGenerating { match_id });

        let result = self.generate_and_queue(matched, buyer_proof, seller_proof).await;
        self.settlements.write().push(result.clone());
        result
    }

    async fn generate_and_queue(
        &self,
        matched: Match,
        buyer_proof: MerkleProof,
        seller_proof: MerkleProof,
    ) -> ProofResult {
        let match_id = matched.match_id;

        let asset_hash = match self.oracle.hash_asset(matched.buy_order.asset_address).await {
            Ok(hash) => hash,
            Err(err) => {
                let error = err.to_string();
                warn!(match_id = %match_id, "asset hash lookup failed: {error}");
                self.event_bus.emit(Event::ProofFailed { match_id, error: error.clone() });
                return ProofResult::failed(match_id, error);
            }
        };

        let whitelist_root = self
            .whitelist
            .root_hex()
            .and_then(|hex| hex.parse::<FixedBytes<32>>().ok())
            .unwrap_or(FixedBytes::ZERO);

        let request = ProofRequest {
            match_id,
            buyer_merkle_proof: buyer_proof,
            seller_merkle_proof: seller_proof,
            buyer_secret: matched.buy_order.secret,
            buyer_nonce: matched.buy_order.nonce,
            seller_secret: matched.sell_order.secret,
            seller_nonce: matched.sell_order.nonce,
            buyer_commitment: matched.buy_order.commitment,
            seller_commitment: matched.sell_order.commitment,
            asset_hash,
            execution_quantity: matched.execution_quantity,
            execution_price: matched.execution_price,
            whitelist_root,
        };

        let result = self.oracle.generate_proof(request).await;

        if result.success {
            let proof_prefix_hex = hex_prefix(&result.proof);
            info!(match_id = %match_id, "proof generated");
            self.event_bus.emit(Event::ProofGenerated { match_id, proof_prefix_hex });
            self.settlement.queue_settlement(matched, result.clone());
        } else {
            let error = result.error.clone().unwrap_or_else(|| "proof oracle returned failure".to_string());
            warn!(match_id = %match_id, "proof generation failed: {error}");
            self.event_bus.emit(Event::ProofFailed { match_id, error });
        }

        result
    }

    pub fn settlements_log(&self) -> Vec<ProofResult> {
        self.settlements.read().clone()
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    let take = bytes.len().min(8);
    format!("0x{}", hex::encode(&bytes[..take]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{PrivateOrder, Side};
    use crate::services::chain::ChainAdapter;
    use crate::config::AppConfig;
    use alloy_primitives::{Address, U256};

    fn sample_order(side: Side, whitelist_index: u64) -> PrivateOrder {
        PrivateOrder {
            commitment: FixedBytes::from([1u8; 32]),
            trader: Address::repeat_byte(0x01),
            asset_address: Address::repeat_byte(0x02),
            side,
            quantity: U256::from(10u64),
            price: U256::from(100u64),
            secret: U256::from(1u64),
            nonce: U256::from(2u64),
            timestamp: 0,
            expiry: i64::MAX,
            whitelist_index,
        }
    }

    fn sample_match(buyer_idx: u64, seller_idx: u64) -> Match {
        Match {
            match_id: FixedBytes::from([9u8; 32]),
            buy_order: sample_order(Side::Buy, buyer_idx),
            sell_order: sample_order(Side::Sell, seller_idx),
            execution_price: U256::from(100u64),
            execution_quantity: U256::from(10u64),
            timestamp: 0,
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            chain_rpc_url: "http://localhost:1".into(),
            horizon_url: "http://localhost:1".into(),
            oracle_url: "http://localhost:1".into(),
            payment_asset_address: "0x0".into(),
            log_level: "error".into(),
            log_json: false,
            whitelist_seed_path: None,
            settlement_poll_max_attempts: 1,
            settlement_poll_interval_ms: 1,
            ws_keepalive_secs: 30,
            chain_submit_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn missing_whitelist_proof_fails_without_calling_the_oracle() {
        let bus = Arc::new(EventBus::new());
        let matcher = Arc::new(MatchingEngine::new(bus.clone()));
        let whitelist = Arc::new(WhitelistService::new());
        let oracle = Arc::new(ProofOracleClient::new("http://localhost:1"));
        let chain = Arc::new(ChainAdapter::new(&test_config()));
        let settlement = Arc::new(SettlementCoordinator::new(chain, bus.clone(), &test_config()));
        let orchestrator = ProofOrchestrator::new(matcher, whitelist, oracle, settlement, bus);

        let matched = sample_match(0, 1);
        let result = orchestrator.process_one(matched).await;

        assert!(!result.success);
        assert_eq!(orchestrator.settlements_log().len(), 1);
    }
}
