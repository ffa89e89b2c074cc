//! Session registry for the push channel (spec §4.7): two indices —
//! channel to sessions and session to channels — kept consistent on every
//! subscribe/unsubscribe/disconnect, plus the per-session outbound queue a
//! connection's write task drains.

use axum::extract::ws::Message;
use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::websocket::frame::ServerFrame;

pub type SessionId = Uuid;

pub struct PushChannelStats {
    pub session_count: usize,
    pub channel_count: usize,
}

#[derive(Default)]
pub struct SessionRegistry {
    senders: DashMap<SessionId, mpsc::UnboundedSender<Message>>,
    channel_sessions: DashMap<String, DashSet<SessionId>>,
    session_channels: DashMap<SessionId, DashSet<String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh connection and returns the receiving end of its
    /// outbound queue; the caller's write task forwards everything sent on
    /// it to the socket.
    pub fn register(&self) -> (SessionId, mpsc::UnboundedReceiver<Message>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(id, tx);
        self.session_channels.insert(id, DashSet::new());
        (id, rx)
    }

    /// Removes a session from both indices. Safe to call more than once.
    pub fn deregister(&self, id: SessionId) {
        self.senders.remove(&id);
        if let Some((_, channels)) = self.session_channels.remove(&id) {
            for channel in channels.iter() {
                if let Some(sessions) = self.channel_sessions.get(channel.as_str()) {
                    sessions.remove(&id);
                }
            }
        }
    }

    pub fn subscribe(&self, id: SessionId, channel: &str) {
        self.channel_sessions.entry(channel.to_string()).or_default().insert(id);
        if let Some(channels) = self.session_channels.get(&id) {
            channels.insert(channel.to_string());
        }
    }

    pub fn unsubscribe(&self, id: SessionId, channel: &str) {
        if let Some(sessions) = self.channel_sessions.get(channel) {
            sessions.remove(&id);
        }
        if let Some(channels) = self.session_channels.get(&id) {
            channels.remove(channel);
        }
    }

    /// Sends `frame` to every session currently subscribed to `channel`.
    /// Sends are non-blocking (`UnboundedSender`), safe to call from inside
    /// an [`crate::events::EventBus`] handler, which must never await.
    pub fn publish(&self, channel: &str, frame: &ServerFrame) {
        let Some(sessions) = self.channel_sessions.get(channel) else { return };
        let payload = Message::Text(frame.to_json());
        for session_id in sessions.iter() {
            if let Some(sender) = self.senders.get(&session_id) {
                let _ = sender.send(payload.clone());
            }
        }
    }

    pub fn send_to(&self, id: SessionId, frame: &ServerFrame) {
        if let Some(sender) = self.senders.get(&id) {
            let _ = sender.send(Message::Text(frame.to_json()));
        }
    }

    /// Sends a transport-level WebSocket ping, used by the keepalive loop
    /// to distinguish a live-but-quiet connection from a dead one. This is
    /// independent of the application-level `{type:"ping"}`/`{type:"pong"}`
    /// text frames a client may also exchange.
    pub fn ping(&self, id: SessionId) {
        if let Some(sender) = self.senders.get(&id) {
            let _ = sender.send(Message::Ping(Vec::new()));
        }
    }

    pub fn stats(&self) -> PushChannelStats {
        PushChannelStats {
            session_count: self.senders.len(),
            channel_count: self.channel_sessions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_only_subscribed_sessions() {
        let registry = SessionRegistry::new();
        let (a, mut rx_a) = registry.register();
        let (_b, mut rx_b) = registry.register();

        registry.subscribe(a, "system");
        registry.publish("system", &ServerFrame::welcome("hi"));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn deregister_removes_session_from_its_channels() {
        let registry = SessionRegistry::new();
        let (a, _rx) = registry.register();
        registry.subscribe(a, "system");
        assert_eq!(registry.stats().session_count, 1);

        registry.deregister(a);
        assert_eq!(registry.stats().session_count, 0);
        registry.publish("system", &ServerFrame::pong());
    }

    #[test]
    fn unsubscribe_stops_delivery_without_disconnecting() {
        let registry = SessionRegistry::new();
        let (a, mut rx) = registry.register();
        registry.subscribe(a, "system");
        registry.unsubscribe(a, "system");

        registry.publish("system", &ServerFrame::pong());
        assert!(rx.try_recv().is_err());
    }
}
