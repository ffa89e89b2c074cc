//! Structured logging setup and secret redaction (spec §6 "Configuration" /
//! §4.6 "Redaction"). The domain `Event` enum already omits `secret` and
//! `nonce` from its payloads structurally — this module covers the other
//! place a secret could leak: a raw request body that a handler logs for
//! debugging before (or instead of) deserializing it into a typed struct.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

/// Initializes the global `tracing` subscriber: `EnvFilter` driven by
/// `config.log_level` (overridable by `RUST_LOG`), and either the JSON or
/// pretty `fmt` layer depending on `config.log_json` — the same
/// `registry().with(filter).with(fmt::layer()).init()` shape the teacher's
/// `main.rs` used, generalized to pick a format at runtime.
pub fn init(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dark_pool_backend={}", config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

/// Recursively strips the configured redaction fields from a JSON value in
/// place, replacing each with a fixed marker so the shape of the logged
/// body is still visible without exposing the value. Invoked by
/// `api::middleware::log_request_body` on every raw request body before it
/// reaches `tracing::debug!`; typed domain structs never need it because
/// their `Serialize` impls already omit these fields.
pub fn redact_json(value: &mut serde_json::Value) {
    redact_with(value, AppConfig::REDACTED_FIELDS);
}

fn redact_with(value: &mut serde_json::Value, fields: &[&str]) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if fields.iter().any(|f| f.eq_ignore_ascii_case(key)) {
                    *entry = serde_json::Value::String("[redacted]".to_string());
                } else {
                    redact_with(entry, fields);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                redact_with(item, fields);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_top_level_secret_and_nonce() {
        let mut body = json!({
            "commitment": "0xabc",
            "secret": "123456",
            "nonce": "789",
        });
        redact_json(&mut body);
        assert_eq!(body["secret"], json!("[redacted]"));
        assert_eq!(body["nonce"], json!("[redacted]"));
        assert_eq!(body["commitment"], json!("0xabc"));
    }

    #[test]
    fn redacts_nested_fields() {
        let mut body = json!({
            "order": { "secret": "xyz", "quantity": "100" },
            "items": [{ "nonce": "1" }, { "nonce": "2" }],
        });
        redact_json(&mut body);
        assert_eq!(body["order"]["secret"], json!("[redacted]"));
        assert_eq!(body["order"]["quantity"], json!("100"));
        assert_eq!(body["items"][0]["nonce"], json!("[redacted]"));
        assert_eq!(body["items"][1]["nonce"], json!("[redacted]"));
    }
}
