use alloy_primitives::FixedBytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::numeric::bytes32_hex;

use super::order_match::Match;
use super::proof::ProofResult;

/// The settlement state machine's legal states.
///
/// `ready` is entered directly from proof success — there is no separate
/// `pending` state a settlement passes through first; `pending` exists only
/// conceptually in the spec's prose and is not itself a named state here
/// because nothing in the system ever constructs it (every settlement the
/// coordinator creates is born `ready`). `failed` is terminal: nothing
/// transitions out of it automatically, though a fresh successful
/// `build_tx` call against a `failed` record does move it back to `ready`
/// (see [`PendingSettlement::retry_build`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Ready,
    AwaitingSignatures,
    Submitted,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSettlement {
    #[serde(with = "bytes32_hex")]
    pub match_id: FixedBytes<32>,
    #[serde(rename = "match")]
    pub matched: Match,
    pub proof_result: ProofResult,
    pub status: SettlementStatus,
    pub unsigned_tx_xdr: Option<String>,
    pub partially_signed_tx_xdr: Option<String>,
    pub buyer_signed: bool,
    pub seller_signed: bool,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingSettlement {
    pub fn new(matched: Match, proof_result: ProofResult) -> Self {
        let now = Utc::now();
        Self {
            match_id: matched.match_id,
            matched,
            proof_result,
            status: SettlementStatus::Ready,
            unsigned_tx_xdr: None,
            partially_signed_tx_xdr: None,
            buyer_signed: false,
            seller_signed: false,
            tx_hash: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn both_signed(&self) -> bool {
        self.buyer_signed && self.seller_signed
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = SettlementStatus::Failed;
        self.error = Some(error.into());
        self.touch();
    }

    /// A failed settlement may be retried from the top: a fresh successful
    /// `build_tx` re-uses the same in-place record and clears the error and
    /// prior signatures, since the transaction it now carries supersedes the
    /// one that failed to build or submit.
    pub fn retry_build(&mut self, unsigned_tx_xdr: String) {
        self.status = SettlementStatus::Ready;
        self.unsigned_tx_xdr = Some(unsigned_tx_xdr);
        self.partially_signed_tx_xdr = None;
        self.buyer_signed = false;
        self.seller_signed = false;
        self.tx_hash = None;
        self.error = None;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{PrivateOrder, Side};
    use alloy_primitives::{Address, U256};

    fn sample_match() -> Match {
        let order = |side| PrivateOrder {
            commitment: FixedBytes::from([2u8; 32]),
            trader: Address::repeat_byte(0x11),
            asset_address: Address::repeat_byte(0x22),
            side,
            quantity: U256::from(10u64),
            price: U256::from(100u64),
            secret: U256::from(1u64),
            nonce: U256::from(2u64),
            timestamp: 1,
            expiry: 1000,
            whitelist_index: 0,
        };
        Match {
            match_id: FixedBytes::from([3u8; 32]),
            buy_order: order(Side::Buy),
            sell_order: order(Side::Sell),
            execution_price: U256::from(100u64),
            execution_quantity: U256::from(10u64),
            timestamp: 1,
        }
    }

    #[test]
    fn new_settlement_starts_ready() {
        let settlement = PendingSettlement::new(
            sample_match(),
            ProofResult::failed(FixedBytes::from([3u8; 32]), "unused"),
        );
        assert_eq!(settlement.status, SettlementStatus::Ready);
        assert!(!settlement.both_signed());
    }

    #[test]
    fn retry_build_clears_prior_signatures_and_error() {
        let mut settlement = PendingSettlement::new(
            sample_match(),
            ProofResult::failed(FixedBytes::from([3u8; 32]), "unused"),
        );
        settlement.buyer_signed = true;
        settlement.mark_failed("chain unavailable");
        settlement.retry_build("new-xdr".into());
        assert_eq!(settlement.status, SettlementStatus::Ready);
        assert!(!settlement.buyer_signed);
        assert!(settlement.error.is_none());
        assert_eq!(settlement.unsigned_tx_xdr.as_deref(), Some("new-xdr"));
    }
}
