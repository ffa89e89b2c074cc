//! Debug-level request body logging for the `/api` surface (spec §6
//! redaction list). Every JSON body is logged at `debug` verbosity with
//! `secret`/`nonce`/`authorization`/`cookie` fields stripped via
//! [`crate::logging::redact_json`] before anything reaches a log sink —
//! handlers never need to redact their own inputs.

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Cap on how much of a request body this middleware will buffer to log.
/// Bodies larger than this are passed through unread and unlogged rather
/// than risking unbounded memory use on a misbehaving client.
const MAX_LOGGED_BODY_BYTES: usize = 64 * 1024;

pub async fn log_request_body(req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();

    let bytes = match to_bytes(body, MAX_LOGGED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            // Body exceeded the cap or failed to read; let the real
            // extractor downstream produce the appropriate rejection.
            let req = Request::from_parts(parts, Body::empty());
            return next.run(req).await;
        }
    };

    if !bytes.is_empty() {
        if let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            crate::logging::redact_json(&mut value);
            tracing::debug!(method = %parts.method, path = %parts.uri.path(), body = %value, "request body");
        }
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    next.run(req).await
}
