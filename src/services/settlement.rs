//! Settlement coordinator (spec §4.4): the per-match state machine that
//! turns a successful proof into a built transaction, collects both
//! parties' signatures, submits to the chain, and polls for confirmation.
//!
//! Grounded in the teacher's `services/settlement.rs` only for its overall
//! shape (a service struct with `thiserror`-typed errors and async methods
//! taking a match/user identifier and returning a typed result) — none of
//! its SQL or resolved-market domain logic carries over, since this
//! coordinator has no database and a completely different state machine.
//! The `lock -> clone -> unlock -> I/O -> lock -> apply` discipline spec §5
//! mandates is followed explicitly in every method that calls the chain
//! adapter.

use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::{Address, FixedBytes};
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::events::EventBus;
use crate::models::order_match::Match;
use crate::models::proof::ProofResult;
use crate::models::settlement::{PendingSettlement, SettlementStatus};
use crate::models::Event;
use crate::services::chain::{ChainAdapter, ChainError, ContractArg, ContractInvocation, SendOutcome, TransactionStatus};
use crate::utils::response::AppError;

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("settlement not found for match")]
    NotFound,
    #[error("signer not part of this trade")]
    NotAParty,
    #[error("{0}")]
    Chain(#[from] ChainError),
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::NotFound => AppError::not_found("settlement not found"),
            SettlementError::NotAParty => AppError::conflict("signer not part of this trade"),
            SettlementError::Chain(chain_err) => chain_err.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareData {
    pub buyer: Address,
    pub seller: Address,
    pub asset: Address,
    pub payment_asset: Address,
    pub quantity: String,
    pub price: String,
    pub proof_hex: String,
    pub public_signals_hex: String,
    pub nullifier_hex: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutcome {
    pub complete: bool,
    pub error: Option<String>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningStatus {
    pub buyer_signed: bool,
    pub seller_signed: bool,
    pub status: SettlementStatus,
}

#[derive(Debug, Clone, Serialize)]
struct BuildInput<'a> {
    invocation: &'a ContractInvocation,
    sequence: i64,
}

pub struct SettlementCoordinator {
    chain: std::sync::Arc<ChainAdapter>,
    event_bus: std::sync::Arc<EventBus>,
    settlements: Mutex<HashMap<FixedBytes<32>, PendingSettlement>>,
    payment_asset: Address,
    poll_max_attempts: u32,
    poll_interval: Duration,
}

impl SettlementCoordinator {
    pub fn new(
        chain: std::sync::Arc<ChainAdapter>,
        event_bus: std::sync::Arc<EventBus>,
        config: &crate::config::AppConfig,
    ) -> Self {
        let payment_asset = config.payment_asset_address.parse().unwrap_or(Address::ZERO);
        Self {
            chain,
            event_bus,
            settlements: Mutex::new(HashMap::new()),
            payment_asset,
            poll_max_attempts: config.settlement_poll_max_attempts,
            poll_interval: Duration::from_millis(config.settlement_poll_interval_ms),
        }
    }

    /// Idempotent on `matchId`: a settlement already on file for this match
    /// is returned unchanged rather than reset to `ready`.
    pub fn queue_settlement(&self, matched: Match, proof_result: ProofResult) -> PendingSettlement {
        let match_id = matched.match_id;
        let mut settlements = self.settlements.lock();
        if let Some(existing) = settlements.get(&match_id) {
            return existing.clone();
        }
        let record = PendingSettlement::new(matched, proof_result);
        settlements.insert(match_id, record.clone());
        drop(settlements);

        info!(match_id = %match_id, "settlement queued");
        self.event_bus.emit(Event::SettlementQueued { match_id });
        record
    }

    pub fn prepare_settlement_data(&self, match_id: FixedBytes<32>) -> Result<PrepareData, SettlementError> {
        let settlements = self.settlements.lock();
        let record = settlements.get(&match_id).ok_or(SettlementError::NotFound)?;
        Ok(PrepareData {
            buyer: record.matched.buy_order.trader,
            seller: record.matched.sell_order.trader,
            asset: record.matched.buy_order.asset_address,
            payment_asset: self.payment_asset,
            quantity: record.matched.execution_quantity.to_string(),
            price: record.matched.execution_price.to_string(),
            proof_hex: format!("0x{}", hex::encode(&record.proof_result.proof)),
            public_signals_hex: format!("0x{}", hex::encode(&record.proof_result.public_signals)),
            nullifier_hex: record.proof_result.nullifier_hash.to_string(),
        })
    }

    /// Fetches the source account sequence, builds the `settle_trade`
    /// invocation, simulates it for resource fees/footprint, and prepares
    /// the unsigned transaction. On simulation failure the record
    /// transitions to `failed` but is not removed — a client may retry by
    /// calling this again (spec §4.4 / §7).
    pub async fn build_settlement_transaction(
        &self,
        match_id: FixedBytes<32>,
        source_account: Address,
    ) -> Result<String, SettlementError> {
        let matched = {
            let settlements = self.settlements.lock();
            let record = settlements.get(&match_id).ok_or(SettlementError::NotFound)?;
            (record.matched.clone(), record.proof_result.clone())
        };
        let (matched, proof_result) = matched;

        let invocation = ContractInvocation {
            contract_fn: "settle_trade",
            source_account,
            args: vec![
                ContractArg::Bytes32(match_id),
                ContractArg::Address(matched.buy_order.trader),
                ContractArg::Address(matched.sell_order.trader),
                ContractArg::Address(matched.buy_order.asset_address),
                ContractArg::Address(self.payment_asset),
                ContractArg::I128(matched.execution_quantity.to_string()),
                ContractArg::I128(matched.execution_price.to_string()),
                ContractArg::Bytes(proof_result.proof.clone()),
                ContractArg::Bytes(proof_result.public_signals.clone()),
            ],
        };

        let result = self.try_build(match_id, source_account, &invocation).await;
        if let Err(err) = &result {
            let mut settlements = self.settlements.lock();
            if let Some(record) = settlements.get_mut(&match_id) {
                record.mark_failed(err.to_string());
            }
            drop(settlements);
            self.event_bus.emit(Event::SettlementFailed { match_id, error: err.to_string() });
        }
        result
    }

    async fn try_build(
        &self,
        match_id: FixedBytes<32>,
        source_account: Address,
        invocation: &ContractInvocation,
    ) -> Result<String, SettlementError> {
        let account = self.chain.get_account(source_account).await?;
        let unsigned_xdr = serde_json::to_string(&BuildInput { invocation, sequence: account.sequence })
            .map_err(|e| SettlementError::Chain(ChainError::Rejected(e.to_string())))?;
        let simulation = self.chain.simulate_transaction(&unsigned_xdr).await?;
        let prepared = self.chain.prepare_transaction(&unsigned_xdr, &simulation).await?;

        let mut settlements = self.settlements.lock();
        if let Some(record) = settlements.get_mut(&match_id) {
            record.retry_build(prepared.unsigned_xdr.clone());
        }
        drop(settlements);

        self.event_bus.emit(Event::SettlementTxBuilt { match_id, tx_hash: prepared.tx_hash });
        Ok(prepared.unsigned_xdr)
    }

    /// Adds one party's signature. If both are now on file, immediately
    /// submits (spec §4.4 `addSignature`).
    pub async fn add_signature(
        &self,
        match_id: FixedBytes<32>,
        signer: Address,
        signed_xdr: String,
    ) -> Result<SignOutcome, SettlementError> {
        let (buyer, seller, both_signed) = {
            let mut settlements = self.settlements.lock();
            let record = settlements.get_mut(&match_id).ok_or(SettlementError::NotFound)?;
            let buyer = record.matched.buy_order.trader;
            let seller = record.matched.sell_order.trader;

            if signer != buyer && signer != seller {
                return Err(SettlementError::NotAParty);
            }

            if signer == buyer {
                record.buyer_signed = true;
            }
            if signer == seller {
                record.seller_signed = true;
            }
            record.partially_signed_tx_xdr = Some(signed_xdr.clone());
            record.status = SettlementStatus::AwaitingSignatures;
            record.touch();
            (buyer, seller, record.both_signed())
        };
        let _ = (buyer, seller);

        self.event_bus.emit(Event::SignatureAdded { match_id, signer });

        if !both_signed {
            return Ok(SignOutcome { complete: false, error: None, tx_hash: None });
        }

        self.event_bus.emit(Event::SignatureComplete { match_id });

        match self.submit_settlement(match_id, signed_xdr).await {
            Ok(outcome) if outcome.success => {
                Ok(SignOutcome { complete: true, error: None, tx_hash: outcome.tx_hash })
            }
            Ok(outcome) => Ok(SignOutcome { complete: false, error: outcome.error, tx_hash: None }),
            Err(err) => Ok(SignOutcome { complete: false, error: Some(err.to_string()), tx_hash: None }),
        }
    }

    /// Sends the fully-signed transaction and, if the chain accepts it for
    /// inclusion, polls for a terminal status up to the configured cap
    /// before falling back to the Horizon-style index (spec §4.4).
    pub async fn submit_settlement(
        &self,
        match_id: FixedBytes<32>,
        signed_xdr: String,
    ) -> Result<SubmitOutcome, SettlementError> {
        {
            let settlements = self.settlements.lock();
            if !settlements.contains_key(&match_id) {
                return Err(SettlementError::NotFound);
            }
        }

        let send_result = self.chain.send_transaction(&signed_xdr).await;

        let send_result = match send_result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.fail(match_id, err.to_string());
                return Ok(SubmitOutcome { success: false, tx_hash: None, error: Some(err.to_string()) });
            }
        };

        let tx_hash = match send_result {
            SendOutcome::Pending { tx_hash } => tx_hash,
            SendOutcome::Rejected { error_xdr } => {
                let error = match error_xdr {
                    Some(xdr) => format!("chain rejected settlement: {xdr}"),
                    None => "chain rejected settlement".to_string(),
                };
                self.fail(match_id, error.clone());
                return Ok(SubmitOutcome { success: false, tx_hash: None, error: Some(error) });
            }
        };

        {
            let mut settlements = self.settlements.lock();
            if let Some(record) = settlements.get_mut(&match_id) {
                record.status = SettlementStatus::Submitted;
                record.touch();
            }
        }

        match self.poll_until_terminal(&tx_hash).await {
            Ok(true) => {
                self.confirm(match_id, tx_hash.clone());
                Ok(SubmitOutcome { success: true, tx_hash: Some(tx_hash), error: None })
            }
            Ok(false) => {
                let error = "transaction failed on-chain".to_string();
                self.fail(match_id, error.clone());
                Ok(SubmitOutcome { success: false, tx_hash: None, error: Some(error) })
            }
            Err(PollOutcome::HorizonConfirmed) => {
                self.confirm(match_id, tx_hash.clone());
                Ok(SubmitOutcome { success: true, tx_hash: Some(tx_hash), error: None })
            }
            Err(PollOutcome::HorizonFailed) => {
                let error = "transaction failed on-chain (Horizon fallback)".to_string();
                self.fail(match_id, error.clone());
                Ok(SubmitOutcome { success: false, tx_hash: None, error: Some(error) })
            }
            Err(PollOutcome::Indeterminate) => {
                // Chain accepted the submission; an indeterminate Horizon
                // lookup is treated as optimistic confirmation (spec §4.4).
                self.confirm(match_id, tx_hash.clone());
                Ok(SubmitOutcome { success: true, tx_hash: Some(tx_hash), error: None })
            }
        }
    }

    /// Returns `Ok(true)` on SUCCESS, `Ok(false)` on any other terminal
    /// status reached via direct polling. If polling itself raises at every
    /// attempt, falls back to the Horizon-style lookup and reports that
    /// result instead via `Err(PollOutcome::*)`.
    async fn poll_until_terminal(&self, tx_hash: &str) -> Result<bool, PollOutcome> {
        for attempt in 0..self.poll_max_attempts {
            match self.chain.get_transaction(tx_hash).await {
                Ok(TransactionStatus::Success) => return Ok(true),
                Ok(TransactionStatus::Failed(reason)) => {
                    warn!(tx_hash, reason, "settlement transaction failed on-chain");
                    return Ok(false);
                }
                Ok(TransactionStatus::Pending) | Ok(TransactionStatus::NotFound) => {
                    self.sleep_with_jitter(attempt).await;
                    continue;
                }
                Err(err) => {
                    warn!(tx_hash, error = %err, "getTransaction raised, falling back to Horizon");
                    return Err(self.horizon_fallback(tx_hash).await);
                }
            }
        }
        Err(self.horizon_fallback(tx_hash).await)
    }

    async fn horizon_fallback(&self, tx_hash: &str) -> PollOutcome {
        match self.chain.get_transaction_via_public_index(tx_hash).await {
            Ok(result) => match result.successful {
                Some(true) => PollOutcome::HorizonConfirmed,
                Some(false) => PollOutcome::HorizonFailed,
                None => PollOutcome::Indeterminate,
            },
            Err(_) => PollOutcome::Indeterminate,
        }
    }

    async fn sleep_with_jitter(&self, attempt: u32) {
        let jitter_ms: u64 = rand::thread_rng().gen_range(0..=50);
        let _ = attempt;
        tokio::time::sleep(self.poll_interval + Duration::from_millis(jitter_ms)).await;
    }

    fn fail(&self, match_id: FixedBytes<32>, error: String) {
        let mut settlements = self.settlements.lock();
        if let Some(record) = settlements.get_mut(&match_id) {
            record.mark_failed(error.clone());
        }
        drop(settlements);
        self.event_bus.emit(Event::SettlementFailed { match_id, error });
    }

    fn confirm(&self, match_id: FixedBytes<32>, tx_hash: String) {
        let mut settlements = self.settlements.lock();
        if let Some(record) = settlements.get_mut(&match_id) {
            record.status = SettlementStatus::Confirmed;
            record.tx_hash = Some(tx_hash.clone());
            record.touch();
        }
        drop(settlements);
        self.event_bus.emit(Event::SettlementConfirmed { match_id, tx_hash });
    }

    /// Escape hatch: unconditionally marks a settlement confirmed (spec
    /// §4.4 `markConfirmed`).
    pub fn mark_confirmed(&self, match_id: FixedBytes<32>, tx_hash: String) -> Result<(), SettlementError> {
        let mut settlements = self.settlements.lock();
        let record = settlements.get_mut(&match_id).ok_or(SettlementError::NotFound)?;
        record.status = SettlementStatus::Confirmed;
        record.tx_hash = Some(tx_hash);
        record.touch();
        Ok(())
    }

    pub fn settlements_for_trader(&self, address: Address) -> Vec<(PendingSettlement, Role)> {
        self.settlements
            .lock()
            .values()
            .filter_map(|record| {
                if record.matched.buy_order.trader == address {
                    Some((record.clone(), Role::Buyer))
                } else if record.matched.sell_order.trader == address {
                    Some((record.clone(), Role::Seller))
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn get_signing_status(&self, match_id: FixedBytes<32>) -> Result<SigningStatus, SettlementError> {
        let settlements = self.settlements.lock();
        let record = settlements.get(&match_id).ok_or(SettlementError::NotFound)?;
        Ok(SigningStatus { buyer_signed: record.buyer_signed, seller_signed: record.seller_signed, status: record.status })
    }

    pub fn get(&self, match_id: FixedBytes<32>) -> Option<PendingSettlement> {
        self.settlements.lock().get(&match_id).cloned()
    }

    pub fn all(&self) -> Vec<PendingSettlement> {
        self.settlements.lock().values().cloned().collect()
    }

    pub fn get_stats(&self) -> HashMap<&'static str, usize> {
        let settlements = self.settlements.lock();
        let mut stats = HashMap::from([
            ("ready", 0),
            ("awaiting_signatures", 0),
            ("submitted", 0),
            ("confirmed", 0),
            ("failed", 0),
        ]);
        for record in settlements.values() {
            let key = match record.status {
                SettlementStatus::Ready => "ready",
                SettlementStatus::AwaitingSignatures => "awaiting_signatures",
                SettlementStatus::Submitted => "submitted",
                SettlementStatus::Confirmed => "confirmed",
                SettlementStatus::Failed => "failed",
            };
            *stats.get_mut(key).unwrap() += 1;
        }
        stats
    }
}

enum PollOutcome {
    HorizonConfirmed,
    HorizonFailed,
    Indeterminate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::order::{PrivateOrder, Side};
    use alloy_primitives::U256;

    fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            chain_rpc_url: "http://localhost:1".into(),
            horizon_url: "http://localhost:1".into(),
            oracle_url: "http://localhost:1".into(),
            payment_asset_address: "0x0000000000000000000000000000000000000000".into(),
            log_level: "error".into(),
            log_json: false,
            whitelist_seed_path: None,
            settlement_poll_max_attempts: 1,
            settlement_poll_interval_ms: 1,
            ws_keepalive_secs: 30,
            chain_submit_timeout_secs: 1,
        }
    }

    fn sample_match(buyer: Address, seller: Address) -> Match {
        let order = |side, trader: Address| PrivateOrder {
            commitment: FixedBytes::from([1u8; 32]),
            trader,
            asset_address: Address::repeat_byte(0x05),
            side,
            quantity: U256::from(10u64),
            price: U256::from(100u64),
            secret: U256::from(1u64),
            nonce: U256::from(1u64),
            timestamp: 0,
            expiry: i64::MAX,
            whitelist_index: 0,
        };
        Match {
            match_id: FixedBytes::from([7u8; 32]),
            buy_order: order(Side::Buy, buyer),
            sell_order: order(Side::Sell, seller),
            execution_price: U256::from(100u64),
            execution_quantity: U256::from(10u64),
            timestamp: 0,
        }
    }

    fn coordinator() -> SettlementCoordinator {
        let config = test_config();
        let chain = std::sync::Arc::new(ChainAdapter::new(&config));
        let bus = std::sync::Arc::new(EventBus::new());
        SettlementCoordinator::new(chain, bus, &config)
    }

    #[test]
    fn queue_settlement_is_idempotent_on_match_id() {
        let coordinator = coordinator();
        let buyer = Address::repeat_byte(0x01);
        let seller = Address::repeat_byte(0x02);
        let matched = sample_match(buyer, seller);
        let proof = ProofResult {
            match_id: matched.match_id,
            proof: vec![1, 2, 3],
            public_signals: vec![4, 5],
            nullifier_hash: FixedBytes::from([6u8; 32]),
            success: true,
            error: None,
        };

        let first = coordinator.queue_settlement(matched.clone(), proof.clone());
        let second = coordinator.queue_settlement(matched, proof);

        assert_eq!(first.status, SettlementStatus::Ready);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(coordinator.all().len(), 1);
    }

    #[tokio::test]
    async fn non_party_signer_is_rejected() {
        let coordinator = coordinator();
        let buyer = Address::repeat_byte(0x01);
        let seller = Address::repeat_byte(0x02);
        let matched = sample_match(buyer, seller);
        let proof = ProofResult {
            match_id: matched.match_id,
            proof: vec![1],
            public_signals: vec![2],
            nullifier_hash: FixedBytes::from([3u8; 32]),
            success: true,
            error: None,
        };
        coordinator.queue_settlement(matched.clone(), proof);

        let outsider = Address::repeat_byte(0x09);
        let result = coordinator.add_signature(matched.match_id, outsider, "xdr".into()).await;
        assert!(matches!(result, Err(SettlementError::NotAParty)));
    }

    #[test]
    fn stats_start_at_zero_for_every_status() {
        let coordinator = coordinator();
        let stats = coordinator.get_stats();
        assert_eq!(stats["ready"], 0);
        assert_eq!(stats["confirmed"], 0);
        assert_eq!(stats["failed"], 0);
    }
}
