//! `POST /api/orders/submit` and `GET /api/orders/:assetAddress` (spec §6 /
//! §4.1). The handler's only job is shaping the wire request into a
//! [`PrivateOrder`] and the matcher's [`SubmitResult`]/[`BookSnapshot`] back
//! into the REST response shapes §6 names — all matching logic lives in
//! [`crate::services::orderbook::MatchingEngine`].

use std::sync::Arc;

use alloy_primitives::{Address, FixedBytes, U256};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::order::{PrivateOrder, Side};
use crate::services::orderbook::BookSnapshot;
use crate::utils::response::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    #[serde(with = "crate::numeric::bytes32_hex")]
    pub commitment: FixedBytes<32>,
    pub trader: Address,
    pub asset_address: Address,
    pub side: Side,
    #[serde(with = "crate::numeric::u256_decimal")]
    pub quantity: U256,
    #[serde(with = "crate::numeric::u256_decimal")]
    pub price: U256,
    #[serde(with = "crate::numeric::u256_decimal")]
    pub secret: U256,
    #[serde(with = "crate::numeric::u256_decimal")]
    pub nonce: U256,
    /// Milliseconds-since-epoch deadline. Defaults to "never" (`i64::MAX`)
    /// when omitted — the spec names this field optional but does not
    /// state a default; see DESIGN.md Open Question follow-up.
    #[serde(default)]
    pub expiry: Option<i64>,
    /// Per spec §9 Open Question (d), the hardcoded trader->index map is
    /// not reproduced; a caller that omits this resolves to index 0 and
    /// will fail proof generation later unless that index is really
    /// theirs — the whitelist service, not this handler, is the source of
    /// truth for membership.
    #[serde(default)]
    pub whitelist_index: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    pub matched: bool,
    pub pending_matches: usize,
    pub order_book: BookSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_match_reason: Option<String>,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitOrderRequest>,
) -> Result<Json<SubmitOrderResponse>, AppError> {
    let now = chrono::Utc::now().timestamp_millis();
    let order = PrivateOrder {
        commitment: request.commitment,
        trader: request.trader,
        asset_address: request.asset_address,
        side: request.side,
        quantity: request.quantity,
        price: request.price,
        secret: request.secret,
        nonce: request.nonce,
        timestamp: now,
        expiry: request.expiry.unwrap_or(i64::MAX),
        whitelist_index: request.whitelist_index.unwrap_or(0),
    };
    let asset_address = order.asset_address;

    let result = state.matching_engine.submit(order)?;

    Ok(Json(SubmitOrderResponse {
        matched: result.matched,
        pending_matches: state.matching_engine.pending_count(),
        order_book: state.matching_engine.book_snapshot(asset_address),
        no_match_reason: result.no_match_reason,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub buy_count: usize,
    pub sell_count: usize,
    pub buy_prices: Vec<String>,
    pub buy_quantities: Vec<String>,
    pub sell_prices: Vec<String>,
    pub sell_quantities: Vec<String>,
}

pub async fn book(
    State(state): State<Arc<AppState>>,
    Path(asset_address): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let asset_address: Address = asset_address
        .parse()
        .map_err(|_| AppError::validation("assetAddress must be a hex-encoded 20-byte address"))?;

    let snapshot = state.matching_engine.book_snapshot(asset_address);
    Ok(Json(BookResponse {
        buy_count: snapshot.buys.len(),
        sell_count: snapshot.sells.len(),
        buy_prices: snapshot.buys.iter().map(|l| l.price.clone()).collect(),
        buy_quantities: snapshot.buys.iter().map(|l| l.quantity.clone()).collect(),
        sell_prices: snapshot.sells.iter().map(|l| l.price.clone()).collect(),
        sell_quantities: snapshot.sells.iter().map(|l| l.quantity.clone()).collect(),
    }))
}
