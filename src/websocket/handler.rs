//! The push channel's axum WebSocket handler (spec §4.7): per-connection
//! session registration, subscribe/unsubscribe/ping handling, and the
//! 30-second keepalive that terminates a connection once it misses too many
//! pongs in a row.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::time::{interval, Instant};
use tracing::{info, warn};

use crate::websocket::frame::{ClientFrame, ServerFrame};
use crate::AppState;

/// A connection is dropped once this many consecutive keepalive intervals
/// pass without a pong.
const MAX_MISSED_KEEPALIVES: u32 = 2;

pub async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let registry = state.session_registry.clone();
    let (session_id, mut outbound_rx) = registry.register();
    registry.subscribe(session_id, "system");
    registry.send_to(session_id, &ServerFrame::welcome("connected to dark pool push channel"));

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    let keepalive_interval = Duration::from_secs(state.config.ws_keepalive_secs);
    let mut keepalive = interval(keepalive_interval);
    keepalive.tick().await; // the first tick fires immediately

    let mut last_pong = Instant::now();
    let mut missed = 0u32;

    loop {
        tokio::select! {
            _ = keepalive.tick() => {
                if last_pong.elapsed() > keepalive_interval {
                    missed += 1;
                } else {
                    missed = 0;
                }
                if missed >= MAX_MISSED_KEEPALIVES {
                    warn!(%session_id, "push channel session missed keepalive, disconnecting");
                    break;
                }
                registry.ping(session_id);
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(&registry, session_id, &text);
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(%session_id, error = %err, "push channel read error");
                        break;
                    }
                }
            }
        }
    }

    registry.deregister(session_id);
    writer.abort();
    info!(%session_id, "push channel session closed");
}

fn handle_client_frame(registry: &crate::websocket::session::SessionRegistry, session_id: crate::websocket::session::SessionId, text: &str) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            registry.send_to(session_id, &ServerFrame::error(format!("malformed frame: {err}")));
            return;
        }
    };

    match frame {
        ClientFrame::Subscribe { channel } => {
            registry.subscribe(session_id, &channel);
            registry.send_to(session_id, &ServerFrame::subscribed(channel));
        }
        ClientFrame::Unsubscribe { channel } => {
            registry.unsubscribe(session_id, &channel);
            registry.send_to(session_id, &ServerFrame::unsubscribed(channel));
        }
        ClientFrame::Ping => {
            registry.send_to(session_id, &ServerFrame::pong());
        }
    }
}
