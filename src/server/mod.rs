//! HTTP and WebSocket binding for the signaling relay
//!
//! - `GET /` — index of the host and guest pages
//! - `GET /ice-servers` — peer connection configuration for browsers
//! - `GET /health` — live session count
//! - `WS /ws` — one connection per socket, JSON events tagged by `"event"`

pub mod ws;

use crate::config::RelayConfig;
use crate::relay::SignalingRelay;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{Html, IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

/// Shared state for every request handler
pub struct ServerState {
    pub relay: SignalingRelay,
    pub config: RelayConfig,
    start_time: Instant,
}

impl ServerState {
    pub fn new(relay: SignalingRelay, config: RelayConfig) -> Arc<Self> {
        Arc::new(Self {
            relay,
            config,
            start_time: Instant::now(),
        })
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_upgrade))
        .route("/ice-servers", get(ice_servers))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<ServerState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("Signaling server listening on http://{}", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let relay = state.relay.clone();
    ws.on_upgrade(move |socket| ws::handle_socket(socket, relay))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /ice-servers
async fn ice_servers(State(state): State<Arc<ServerState>>) -> Json<serde_json::Value> {
    Json(state.config.ice_client_config())
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.relay.registry().session_count().await,
        "connections": state.relay.connection_count().await,
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "version": crate::VERSION,
    }))
}

/// First non-loopback IPv4 address of this machine.
///
/// Connecting a UDP socket only selects a route; nothing is sent.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// Host and guest page URLs for the startup banner
pub fn banner(port: u16) -> String {
    let ip = local_ipv4()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "localhost".to_string());
    format!(
        "CrabRelay signaling server v{}\n  Signaling:   ws://{ip}:{port}/ws\n  ICE servers: http://{ip}:{port}/ice-servers\n  Health:      http://{ip}:{port}/health",
        crate::VERSION,
    )
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>CrabRelay</title></head>
<body>
<h1>CrabRelay</h1>
<p>Host and guest pages are served separately and connect here.</p>
<ul>
<li>Host: send <code>hostJoin</code> and share the returned session id</li>
<li>Guest: send <code>guestJoin</code> with that id and stream your camera</li>
</ul>
<p>Signaling WebSocket: <code>/ws</code>. Peer connection config: <a href="/ice-servers"><code>/ice-servers</code></a>. Status: <a href="/health"><code>/health</code></a>.</p>
</body>
</html>
"#;
