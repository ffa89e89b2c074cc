//! Wire frames for the push channel (spec §4.7). Client frames are the
//! inbound subscribe/unsubscribe/ping control messages; server frames are
//! domain [`Event`]s and the small set of acks/errors the channel itself
//! produces.

use serde::{Deserialize, Serialize};

use crate::models::Event;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Ping,
}

/// Untagged so a domain [`Event`] serializes exactly as it does everywhere
/// else (`{"event": "...", "data": {...}}`), while the channel's own control
/// frames carry their own `type` tag.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Event(Event),
    Control(ControlFrame),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    Welcome { message: String },
    Subscribed { channel: String },
    Unsubscribed { channel: String },
    Pong { timestamp: i64 },
    Error { message: String },
}

impl ServerFrame {
    pub fn welcome(message: impl Into<String>) -> Self {
        ServerFrame::Control(ControlFrame::Welcome { message: message.into() })
    }

    pub fn subscribed(channel: impl Into<String>) -> Self {
        ServerFrame::Control(ControlFrame::Subscribed { channel: channel.into() })
    }

    pub fn unsubscribed(channel: impl Into<String>) -> Self {
        ServerFrame::Control(ControlFrame::Unsubscribed { channel: channel.into() })
    }

    pub fn pong() -> Self {
        ServerFrame::Control(ControlFrame::Pong { timestamp: chrono::Utc::now().timestamp_millis() })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Control(ControlFrame::Error { message: message.into() })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error","message":"frame encoding failed"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_frame_carries_its_type_tag() {
        let frame = ServerFrame::welcome("connected");
        let json = frame.to_json();
        assert!(json.contains(r#""type":"welcome""#));
        assert!(json.contains("connected"));
    }

    #[test]
    fn client_subscribe_frame_parses() {
        let raw = r#"{"type":"subscribe","channel":"system"}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        assert!(matches!(frame, ClientFrame::Subscribe { channel } if channel == "system"));
    }
}
