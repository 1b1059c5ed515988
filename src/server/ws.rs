//! One WebSocket, one relay connection.
//!
//! Text frames carry JSON [`ClientEvent`]s. Outbound [`ServerEvent`]s are
//! written by a separate task draining the connection's queue, so a slow
//! socket never stalls the relay.

use crate::relay::{ClientEvent, ConnectionId, ServerEvent, SignalingRelay};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

/// Drive a single WebSocket until it closes or errors
pub async fn handle_socket(socket: WebSocket, relay: SignalingRelay) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (conn, mut outbound) = relay.connect().await;

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match encode_event(&event) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Failed to encode outbound event: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => dispatch(&relay, conn, text.as_str()).await,
            Ok(Message::Binary(_)) => {
                log::debug!("[{}] Ignoring binary frame", conn);
            }
            Ok(Message::Close(_)) => break,
            // ping/pong answered by axum
            Ok(_) => {}
            Err(e) => {
                relay.handle_transport_error(conn, &e.to_string()).await;
                break;
            }
        }
    }

    relay.disconnect(conn).await;
    writer.abort();
}

async fn dispatch(relay: &SignalingRelay, conn: ConnectionId, text: &str) {
    match parse_event(text) {
        Ok(event) => {
            log::debug!("[{}] {}", conn, event.name());
            relay.handle_event(conn, event).await;
        }
        Err(e) => log::warn!("[{}] Ignoring malformed message: {}", conn, e),
    }
}

fn parse_event(text: &str) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Wire encoding of an outbound event
pub fn encode_event(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}
