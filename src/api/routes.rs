use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers;
use crate::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/commitment/generate", post(handlers::commitment::generate))
        .route("/commitment/hash-asset", post(handlers::commitment::hash_asset))
        .route("/orders/submit", post(handlers::orders::submit))
        .route("/orders/:asset_address", get(handlers::orders::book))
        .route("/matches", get(handlers::matches::completed))
        .route("/matches/pending", get(handlers::matches::pending))
        .route("/matches/settlements", get(handlers::matches::settlements_log))
        .route("/matches/process", post(handlers::matches::process))
        .route("/settlement/pending", get(handlers::settlement::pending))
        .route("/settlement/stats/summary", get(handlers::settlement::stats))
        .route("/settlement/for-trader/:address", get(handlers::settlement::for_trader))
        .route("/settlement/:match_id", get(handlers::settlement::get_one))
        .route("/settlement/:match_id/signing-status", get(handlers::settlement::signing_status))
        .route("/settlement/:match_id/prepare", post(handlers::settlement::prepare))
        .route("/settlement/:match_id/build-tx", post(handlers::settlement::build_tx))
        .route("/settlement/:match_id/sign", post(handlers::settlement::sign))
        .route("/settlement/:match_id/submit", post(handlers::settlement::submit))
        .route("/settlement/:match_id/confirm", post(handlers::settlement::confirm))
        .route("/whitelist/sync", post(handlers::whitelist::sync))
        .route("/whitelist/status", get(handlers::whitelist::status))
}
