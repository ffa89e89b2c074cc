use alloy_primitives::{Address, FixedBytes};
use serde::Serialize;

use super::order_match::Match;
use super::proof::ProofResult;

/// The closed set of domain events the bus carries. Every variant's payload
/// is built only from fields already safe to expose — `PrivateOrder`'s
/// `secret`/`nonce` never appear here, so redaction is structural (by
/// omission) rather than a filter applied at emit time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    #[serde(rename = "order:submitted")]
    OrderSubmitted {
        asset_address: Address,
        trader: Address,
    },
    #[serde(rename = "order:matched")]
    OrderMatched { matched: Box<Match> },
    #[serde(rename = "proof:generating")]
    ProofGenerating { match_id: FixedBytes<32> },
    #[serde(rename = "proof:generated")]
    ProofGenerated {
        match_id: FixedBytes<32>,
        proof_prefix_hex: String,
    },
    #[serde(rename = "proof:failed")]
    ProofFailed {
        match_id: FixedBytes<32>,
        error: String,
    },
    #[serde(rename = "settlement:queued")]
    SettlementQueued { match_id: FixedBytes<32> },
    #[serde(rename = "settlement:txBuilt")]
    SettlementTxBuilt {
        match_id: FixedBytes<32>,
        tx_hash: String,
    },
    #[serde(rename = "settlement:confirmed")]
    SettlementConfirmed {
        match_id: FixedBytes<32>,
        tx_hash: String,
    },
    #[serde(rename = "settlement:failed")]
    SettlementFailed {
        match_id: FixedBytes<32>,
        error: String,
    },
    #[serde(rename = "signature:added")]
    SignatureAdded {
        match_id: FixedBytes<32>,
        signer: Address,
    },
    #[serde(rename = "signature:complete")]
    SignatureComplete { match_id: FixedBytes<32> },
}

impl Event {
    /// Routing keys this event must be delivered to, per §4.6/§4.7:
    /// `orderbook:<asset>`, `trader:<address>`, `settlement:<matchId>`.
    /// Every routing key a variant names is returned; callers fan out the
    /// same `Event` value to every channel in the list.
    pub fn channels(&self) -> Vec<String> {
        match self {
            Event::OrderSubmitted { asset_address, trader } => vec![
                format!("orderbook:{asset_address}"),
                format!("trader:{trader}"),
            ],
            Event::OrderMatched { matched } => vec![
                format!("orderbook:{}", matched.buy_order.asset_address),
                format!("trader:{}", matched.buy_order.trader),
                format!("trader:{}", matched.sell_order.trader),
                format!("settlement:{}", matched.match_id),
            ],
            Event::ProofGenerating { match_id }
            | Event::ProofGenerated { match_id, .. }
            | Event::ProofFailed { match_id, .. }
            | Event::SettlementQueued { match_id }
            | Event::SettlementTxBuilt { match_id, .. }
            | Event::SettlementConfirmed { match_id, .. }
            | Event::SettlementFailed { match_id, .. }
            | Event::SignatureAdded { match_id, .. }
            | Event::SignatureComplete { match_id } => vec![format!("settlement:{match_id}")],
        }
    }

    /// The closed tag used by `subscribe`/`unsubscribe` and logged for
    /// observability.
    pub fn tag(&self) -> &'static str {
        match self {
            Event::OrderSubmitted { .. } => "order:submitted",
            Event::OrderMatched { .. } => "order:matched",
            Event::ProofGenerating { .. } => "proof:generating",
            Event::ProofGenerated { .. } => "proof:generated",
            Event::ProofFailed { .. } => "proof:failed",
            Event::SettlementQueued { .. } => "settlement:queued",
            Event::SettlementTxBuilt { .. } => "settlement:txBuilt",
            Event::SettlementConfirmed { .. } => "settlement:confirmed",
            Event::SettlementFailed { .. } => "settlement:failed",
            Event::SignatureAdded { .. } => "signature:added",
            Event::SignatureComplete { .. } => "signature:complete",
        }
    }
}
